//! Read-only queries against the host service registry.

use super::backend::unit_name;
use super::BackendKind;
use crate::service::ServiceStatus;
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;

/// Default upper bound on a single probe query.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Side-effect-free status queries.
///
/// Implementations never fail: any query error degrades to `false`, so a
/// flaky registry shows up as `NotInstalled`/`Stopped` rather than an error.
#[async_trait]
pub trait ServiceStatusProbe: Send + Sync {
    async fn exists(&self, name: &str) -> bool;

    /// Running implies installed; a missing service is never running.
    async fn is_running(&self, name: &str) -> bool;

    /// Combined status for `name`.
    async fn status(&self, name: &str) -> ServiceStatus {
        if !self.exists(name).await {
            return ServiceStatus::NotInstalled;
        }
        ServiceStatus::from_probe(true, self.is_running(name).await)
    }
}

/// [`ServiceStatusProbe`] that shells out to `systemctl` or `sc.exe`.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    kind: BackendKind,
    timeout: Duration,
}

impl SystemProbe {
    pub fn new(kind: BackendKind, timeout: Duration) -> Self {
        Self {
            kind: kind.resolve(),
            timeout,
        }
    }

    /// Run a probe command; `None` on launch failure or timeout.
    async fn query(&self, program: &str, args: &[&str]) -> Option<Output> {
        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => Some(output),
            Ok(Err(e)) => {
                tracing::debug!("Probe '{} {}' could not run: {}", program, args.join(" "), e);
                None
            }
            Err(_) => {
                tracing::debug!(
                    "Probe '{} {}' timed out after {:?}",
                    program,
                    args.join(" "),
                    self.timeout
                );
                None
            }
        }
    }
}

#[async_trait]
impl ServiceStatusProbe for SystemProbe {
    async fn exists(&self, name: &str) -> bool {
        match self.kind {
            BackendKind::WindowsSc => self
                .query("sc.exe", &["query", name])
                .await
                .is_some_and(|out| out.status.success()),
            BackendKind::Systemd | BackendKind::Auto => {
                let unit = unit_name(name);
                self.query("systemctl", &["show", "-p", "LoadState", "--value", &unit])
                    .await
                    .is_some_and(|out| systemd_loaded(&String::from_utf8_lossy(&out.stdout)))
            }
        }
    }

    async fn is_running(&self, name: &str) -> bool {
        self.exists(name).await && self.active(name).await
    }

    async fn status(&self, name: &str) -> ServiceStatus {
        if !self.exists(name).await {
            return ServiceStatus::NotInstalled;
        }
        ServiceStatus::from_probe(true, self.active(name).await)
    }
}

impl SystemProbe {
    /// Running check without the existence precondition.
    async fn active(&self, name: &str) -> bool {
        match self.kind {
            BackendKind::WindowsSc => self
                .query("sc.exe", &["query", name])
                .await
                .is_some_and(|out| sc_running(&String::from_utf8_lossy(&out.stdout))),
            BackendKind::Systemd | BackendKind::Auto => {
                let unit = unit_name(name);
                self.query("systemctl", &["is-active", &unit])
                    .await
                    .is_some_and(|out| systemd_active(&String::from_utf8_lossy(&out.stdout)))
            }
        }
    }
}

fn systemd_loaded(stdout: &str) -> bool {
    stdout.trim() == "loaded"
}

fn systemd_active(stdout: &str) -> bool {
    stdout.trim() == "active"
}

fn sc_running(stdout: &str) -> bool {
    stdout
        .lines()
        .any(|line| line.trim_start().starts_with("STATE") && line.contains("RUNNING"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn systemd_output_parsing() {
        assert!(systemd_loaded("loaded\n"));
        assert!(!systemd_loaded("not-found\n"));
        assert!(systemd_active("active\n"));
        assert!(!systemd_active("inactive\n"));
        assert!(!systemd_active("activating\n"));
    }

    #[test]
    fn sc_query_parsing() {
        let running = "SERVICE_NAME: api\n        TYPE               : 10  WIN32_OWN_PROCESS\n        STATE              : 4  RUNNING\n";
        let stopped = "SERVICE_NAME: api\n        STATE              : 1  STOPPED\n";
        assert!(sc_running(running));
        assert!(!sc_running(stopped));
    }

    #[tokio::test]
    async fn unavailable_tooling_degrades_to_not_installed() {
        // A unit name no host will have; on hosts without systemctl the launch fails.
        let probe = SystemProbe::new(BackendKind::Systemd, Duration::from_secs(2));
        let name = "warden-probe-test-unit-that-does-not-exist";
        assert!(!probe.exists(name).await);
        assert!(!probe.is_running(name).await);
        assert_eq!(probe.status(name).await, ServiceStatus::NotInstalled);
    }
}
