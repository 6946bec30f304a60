//! Service mode: the background tasks a managed service runs.
//!
//! When the host starts a managed service it launches `warden worker`,
//! which runs a [`WorkerSupervisor`] with up to three periodic tasks:
//!
//! - heartbeat: one event log entry per interval
//! - HTTP poll: one GET per interval ([`HttpPoller`])
//! - database health: a liveness query per interval, reconnecting on
//!   failure ([`DatabaseSession`])
//!
//! Every wait inside these tasks goes through [`sleep_or_cancelled`], so a
//! cancelled supervisor never waits out a full interval.

mod database;
mod heartbeat;
mod http;
mod supervisor;
mod wait;

pub use database::DatabaseSession;
pub use http::{validate_url, HttpPoller};
pub use supervisor::{ShutdownReport, WorkerSupervisor};
pub use wait::sleep_or_cancelled;
pub(crate) use wait::panic_message;
