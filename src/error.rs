// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::control::CommandError;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(warden::config::validation),
        help("Run `warden validate` for detailed validation errors")
    )]
    Validation(String),

    #[error("Service not found: {0}")]
    #[diagnostic(
        code(warden::service::not_found),
        help("Check configured services with `warden status` or validate your warden.yaml")
    )]
    ServiceNotFound(String),

    #[error("Control command error: {0}")]
    #[diagnostic(
        code(warden::control::command),
        help("Check that the service manager is available and that `elevate` grants the needed privileges")
    )]
    Command(#[from] CommandError),

    #[error("Invalid URL '{url}': {reason}")]
    #[diagnostic(code(warden::worker::invalid_url))]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    #[diagnostic(
        code(warden::database::error),
        help("Check the database path in the worker section of warden.yaml")
    )]
    Database(#[from] tokio_rusqlite::Error),

    #[error("Event log error: {0}")]
    EventLog(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::ServiceNotFound(name) => Some(format!(
                "'{}' is not listed under 'services:' in warden.yaml. Run 'warden status' to see configured services.",
                name
            )),
            Error::Config(msg) if msg.contains("Could not find") => Some(
                "Create a warden.yaml in this directory, pass one with -c, or set WARDEN_CONFIG".to_string(),
            ),
            Error::Config(_) | Error::Validation(_) => {
                Some("Validate your config with: warden validate".to_string())
            }
            Error::Command(CommandError::Launch { .. }) => Some(
                "The service manager binary could not be run. On Linux this needs systemctl; on Windows sc.exe and net.".to_string(),
            ),
            Error::Command(CommandError::Timeout { .. }) => Some(
                "Increase 'command_timeout' in warden.yaml if the service manager is slow on this host".to_string(),
            ),
            Error::InvalidUrl { .. } => {
                Some("Only http:// and https:// URLs are supported".to_string())
            }
            Error::Database(e) => {
                // tokio_rusqlite wraps the underlying error opaquely, so match on text.
                let err_str = e.to_string();
                if err_str.contains("database is locked") || err_str.contains("SQLITE_BUSY") {
                    Some("Another process holds a write lock on the database; the worker will retry on its next check".to_string())
                } else if err_str.contains("unable to open") || err_str.contains("SQLITE_CANTOPEN") {
                    Some("Check that the database directory exists and is writable".to_string())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
