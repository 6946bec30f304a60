//! Boundary to the host's service manager.
//!
//! All mutating interactions with the OS go through a [`CommandRunner`]
//! executing a [`ControlCommand`] rendered by a [`ControlBackend`]. Read-only
//! status queries go through a [`ServiceStatusProbe`]. Both seams are traits
//! so the orchestrator can run against [`fake::FakeServiceHost`] in tests.

mod backend;
mod error;
pub mod fake;
mod probe;
mod runner;

pub use backend::{BackendKind, ControlAction, ControlBackend, ControlCommand, DEFAULT_UNIT_DIR};
pub use error::CommandError;
pub use probe::{ServiceStatusProbe, SystemProbe, DEFAULT_PROBE_TIMEOUT};
pub use runner::{CommandRunner, SystemCommandRunner, DEFAULT_COMMAND_TIMEOUT};
