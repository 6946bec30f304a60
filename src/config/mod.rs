//! Configuration parsing and types.
//!
//! - `types` - Root config (`Config`) and managed services (`ServiceConfig`)
//! - `worker` - Service-mode tasks (`WorkerConfig`, `HttpPollConfig`, `DatabaseConfig`)
//! - `duration` - Human-readable duration strings
//! - `parser` - Locating and parsing `warden.yaml`
//! - `validation` - Config validation

mod duration;
mod parser;
mod types;
mod validation;
mod worker;

pub use duration::*;
pub use parser::*;
pub use types::*;
pub use validation::*;
pub use worker::*;
