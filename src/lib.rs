//! # Service Warden
//!
//! Install, uninstall, start, stop and restart OS-managed background
//! services, and run the periodic work those services do once started.
//!
//! ## Features
//!
//! - **Lifecycle control**: each operation maps onto the host's service
//!   manager (`systemctl` or `sc.exe`/`net`) through a [`control::CommandRunner`]
//! - **One operation at a time**: a second call on a busy service gets a
//!   `Busy` result immediately instead of queueing
//! - **Status feed**: a 1s synchronizer publishes [`service::StatusChange`]s
//!   without ever blocking on a lifecycle operation
//! - **Service mode**: `warden worker` runs heartbeat, HTTP poll and database
//!   health tasks under a [`worker::WorkerSupervisor`] with bounded shutdown
//!
//! ## Quick Start
//!
//! ```no_run
//! use service_warden::{Orchestrator, Parser};
//!
//! # async fn example() -> Result<(), service_warden::Error> {
//! let config = Parser::new().load_config("warden.yaml")?;
//! let orchestrator = Orchestrator::builder().config(config).build()?;
//! orchestrator.start_monitoring().await;
//!
//! let result = orchestrator.restart("test-log").await;
//! println!("{}", result);
//!
//! orchestrator.cleanup().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod eventlog;
pub mod orchestrator;
pub mod service;
pub mod worker;

pub use config::{Config, Parser};
pub use error::{Error, Result};
pub use eventlog::EventLog;
pub use orchestrator::Orchestrator;
pub use service::{LifecycleOp, LifecycleResult, ServiceStatus};
