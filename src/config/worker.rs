//! Configuration for service mode (`warden worker`).

use super::types::duration_or;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_HTTP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_DB_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_DB_QUERY: &str = "SELECT datetime('now')";

/// Background tasks run inside a managed service process.
///
/// ```yaml
/// worker:
///   heartbeat_interval: 60s
///   event_log: /var/log/test-log.log
///   http:
///     url: http://localhost:8080/api/test
///     interval: 30s
///   database:
///     path: /var/lib/test-log/health.db
/// ```
///
/// `http` and `database` are optional; an absent section means that task
/// is not started.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval: Option<String>,

    /// Bound on joining the tasks after cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_timeout: Option<String>,

    /// Append-only event log file. Without it events go to tracing only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpPollConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConfig>,
}

impl WorkerConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        duration_or(&self.heartbeat_interval, DEFAULT_HEARTBEAT_INTERVAL)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        duration_or(&self.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

/// Outbound HTTP poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpPollConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Per-request timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl HttpPollConfig {
    pub fn interval(&self) -> Duration {
        duration_or(&self.interval, DEFAULT_HTTP_INTERVAL)
    }

    pub fn timeout(&self) -> Duration {
        duration_or(&self.timeout, DEFAULT_HTTP_TIMEOUT)
    }
}

/// Database liveness check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite database file (`:memory:` for an in-process database).
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

impl DatabaseConfig {
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or(DEFAULT_DB_QUERY)
    }

    pub fn interval(&self) -> Duration {
        duration_or(&self.interval, DEFAULT_DB_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_defaults() {
        let worker = WorkerConfig::default();
        assert_eq!(worker.heartbeat_interval(), Duration::from_secs(60));
        assert_eq!(worker.shutdown_timeout(), Duration::from_secs(5));
        assert!(worker.http.is_none());
        assert!(worker.database.is_none());
    }

    #[test]
    fn sections_from_yaml() {
        let yaml = r#"
heartbeat_interval: 10s
http:
  url: http://localhost:8080/api/test
database:
  path: health.db
  interval: 1m
"#;
        let worker: WorkerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(worker.heartbeat_interval(), Duration::from_secs(10));

        let http = worker.http.unwrap();
        assert_eq!(http.interval(), Duration::from_secs(30));
        assert_eq!(http.timeout(), Duration::from_secs(10));

        let db = worker.database.unwrap();
        assert_eq!(db.query(), "SELECT datetime('now')");
        assert_eq!(db.interval(), Duration::from_secs(60));
    }
}
