//! Root configuration types for `warden.yaml`.

use super::{parse_duration_string, WorkerConfig};
use crate::control::{BackendKind, ControlBackend, SystemCommandRunner, SystemProbe};
use crate::service::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Root configuration structure for warden.yaml
///
/// ```yaml
/// backend: systemd
/// elevate: ["sudo", "-n"]
/// settle_delay: 2s
/// services:
///   - name: test-log
///     display_name: Test Log Service
///     description: Writes a heartbeat line every minute
///     executable: /usr/local/bin/warden worker --service test-log
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,

    /// Argv prefix for every mutating control command (never for probes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elevate: Vec<String>,

    /// Where systemd unit files are written. Ignored by the Windows backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<String>,

    /// Pause between stop and start inside restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<String>,

    /// Managed services, in display order.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Config {
    /// Status polling interval, default 1s.
    pub fn poll_interval(&self) -> Duration {
        duration_or(&self.poll_interval, DEFAULT_POLL_INTERVAL)
    }

    /// Restart settle delay, default 2s.
    pub fn settle_delay(&self) -> Duration {
        duration_or(&self.settle_delay, DEFAULT_SETTLE_DELAY)
    }

    pub fn command_timeout(&self) -> Duration {
        duration_or(&self.command_timeout, crate::control::DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn probe_timeout(&self) -> Duration {
        duration_or(&self.probe_timeout, crate::control::DEFAULT_PROBE_TIMEOUT)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Descriptors for every configured service, in configuration order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.services.iter().map(ServiceConfig::to_descriptor).collect()
    }

    /// Command renderer for the configured backend.
    pub fn control_backend(&self) -> ControlBackend {
        let backend = ControlBackend::new(self.backend).with_elevation(self.elevate.clone());
        match &self.unit_dir {
            Some(dir) => backend.with_unit_dir(dir.clone()),
            None => backend,
        }
    }

    pub fn command_runner(&self) -> SystemCommandRunner {
        SystemCommandRunner::new(self.command_timeout())
    }

    pub fn status_probe(&self) -> SystemProbe {
        SystemProbe::new(self.backend, self.probe_timeout())
    }

    /// Make relative paths relative to the directory holding the config file.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(dir) = self.unit_dir.take() {
            self.unit_dir = Some(absolutize(base, dir));
        }
        if let Some(log) = self.worker.event_log.take() {
            self.worker.event_log = Some(absolutize(base, log));
        }
        if let Some(db) = self.worker.database.as_mut() {
            if db.path != Path::new(":memory:") {
                db.path = absolutize(base, std::mem::take(&mut db.path));
            }
        }
    }
}

/// One managed service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub name: String,

    /// Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Program (with arguments) the host launches as the service.
    pub executable: String,
}

impl ServiceConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn to_descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::new(
            self.name.clone(),
            self.display_name(),
            self.description.clone(),
            self.executable.clone(),
        )
    }
}

/// Parse an optional duration string, falling back to `default` when absent or invalid.
pub(crate) fn duration_or(value: &Option<String>, default: Duration) -> Duration {
    value
        .as_deref()
        .and_then(parse_duration_string)
        .unwrap_or(default)
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.command_timeout(), Duration::from_secs(60));
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.backend, BackendKind::Auto);
    }

    #[test]
    fn configured_durations_override_defaults() {
        let config = Config {
            poll_interval: Some("250ms".to_string()),
            settle_delay: Some("0s".to_string()),
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.settle_delay(), Duration::ZERO);
    }

    #[test]
    fn display_name_falls_back_to_name() {
        let service = ServiceConfig {
            name: "api".to_string(),
            display_name: None,
            description: String::new(),
            executable: "/bin/api".to_string(),
        };
        assert_eq!(service.display_name(), "api");
        assert_eq!(service.to_descriptor().display_name, "api");
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let mut config = Config {
            unit_dir: Some(PathBuf::from("units")),
            ..Default::default()
        };
        config.worker.event_log = Some(PathBuf::from("/var/log/warden.log"));
        config.resolve_paths(Path::new("/etc/warden"));
        assert_eq!(config.unit_dir, Some(PathBuf::from("/etc/warden/units")));
        assert_eq!(
            config.worker.event_log,
            Some(PathBuf::from("/var/log/warden.log"))
        );
    }
}
