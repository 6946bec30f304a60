//! Lifecycle orchestration for the managed services.
//!
//! [`Orchestrator`] is the registry callers talk to. It owns one
//! [`ServiceController`] per service and a [`StatusSynchronizer`] that keeps
//! their status caches fresh.

mod builder;
mod controller;
mod core;
mod monitoring;

pub use builder::OrchestratorBuilder;
pub use controller::ServiceController;
pub use core::{Orchestrator, ServiceSnapshot};
pub use monitoring::StatusSynchronizer;
