//! Service identity, status and lifecycle result types.
//!
//! Everything here is plain data shared by the control layer, the
//! orchestrator and the presentation layer:
//!
//! - [`ServiceDescriptor`]: the static identity of a managed service
//! - [`ServiceStatus`]: what the OS currently reports (`NotInstalled | Stopped | Running`)
//! - [`LifecycleResult`]: what every lifecycle operation returns
//! - [`StatusChange`]: what the status feed delivers
//!
//! # Example
//!
//! ```
//! use service_warden::service::{LifecycleOp, ServiceStatus};
//!
//! assert!(LifecycleOp::Start.is_available(ServiceStatus::Stopped));
//! assert!(!LifecycleOp::Uninstall.is_available(ServiceStatus::Running));
//! ```

mod types;

pub use types::*;
