//! Per-service lifecycle state machine.

use crate::control::{
    CommandError, CommandRunner, ControlAction, ControlBackend, ServiceStatusProbe,
};
use crate::service::{LifecycleOp, LifecycleResult, Outcome, ServiceDescriptor, ServiceStatus};
use crate::worker::sleep_or_cancelled;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_SETTLE_DELAY;

/// Owns the lifecycle of one managed service.
///
/// At most one lifecycle operation runs at a time. A call made while another
/// is in flight returns [`Outcome::Busy`] immediately instead of queueing.
/// Restart holds the gate for its whole stop, settle, start sequence.
///
/// The cached status is written only by the status synchronizer; lifecycle
/// operations always consult the probe directly.
pub struct ServiceController {
    descriptor: ServiceDescriptor,
    runner: Arc<dyn CommandRunner>,
    probe: Arc<dyn ServiceStatusProbe>,
    backend: ControlBackend,
    settle_delay: Duration,
    cancel: CancellationToken,
    in_flight: AtomicBool,
    cached: RwLock<Option<ServiceStatus>>,
}

/// Clears the in-flight flag when the operation ends, including by panic
/// or by the operation future being dropped.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl ServiceController {
    pub fn new(
        descriptor: ServiceDescriptor,
        runner: Arc<dyn CommandRunner>,
        probe: Arc<dyn ServiceStatusProbe>,
        backend: ControlBackend,
    ) -> Self {
        Self {
            descriptor,
            runner,
            probe,
            backend,
            settle_delay: DEFAULT_SETTLE_DELAY,
            cancel: CancellationToken::new(),
            in_flight: AtomicBool::new(false),
            cached: RwLock::new(None),
        }
    }

    /// Pause between stop and start inside restart.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Token whose cancellation interrupts the restart settle delay and
    /// rejects new operations.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Whether a lifecycle operation is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Last status recorded by the synchronizer, `None` before the first poll.
    pub fn cached_status(&self) -> Option<ServiceStatus> {
        *self.cached.read()
    }

    pub(crate) fn record_observed(&self, status: ServiceStatus) {
        *self.cached.write() = Some(status);
    }

    /// Operations an operator should be offered right now.
    ///
    /// Empty while busy or before the first status observation.
    pub fn available_actions(&self) -> Vec<LifecycleOp> {
        if self.is_busy() {
            return Vec::new();
        }
        match self.cached_status() {
            Some(status) => LifecycleOp::ALL
                .into_iter()
                .filter(|op| op.is_available(status))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Query the live status. Never touches the operation gate.
    pub async fn probe_status(&self) -> ServiceStatus {
        self.probe.status(self.name()).await
    }

    pub async fn install(&self) -> LifecycleResult {
        self.execute(LifecycleOp::Install).await
    }

    pub async fn uninstall(&self) -> LifecycleResult {
        self.execute(LifecycleOp::Uninstall).await
    }

    pub async fn start(&self) -> LifecycleResult {
        self.execute(LifecycleOp::Start).await
    }

    pub async fn stop(&self) -> LifecycleResult {
        self.execute(LifecycleOp::Stop).await
    }

    pub async fn restart(&self) -> LifecycleResult {
        self.execute(LifecycleOp::Restart).await
    }

    /// Run `op` behind the per-service gate.
    pub async fn execute(&self, op: LifecycleOp) -> LifecycleResult {
        let Some(_guard) = self.try_acquire() else {
            tracing::debug!(service = %self.name(), %op, "Rejected: operation already in flight");
            return LifecycleResult::busy(self.name(), op);
        };

        if self.cancel.is_cancelled() {
            return LifecycleResult::cancelled(self.name(), op);
        }

        let result = match op {
            LifecycleOp::Install => self.do_install().await,
            LifecycleOp::Uninstall => self.do_uninstall().await,
            LifecycleOp::Start => self.do_start().await,
            LifecycleOp::Stop => self.do_stop().await,
            LifecycleOp::Restart => self.do_restart().await,
        };

        if result.success {
            tracing::info!(service = %self.name(), %op, "{}", result.message);
        } else {
            tracing::warn!(service = %self.name(), %op, outcome = ?result.outcome, "{}", result.message);
        }
        result
    }

    fn try_acquire(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight {
                flag: &self.in_flight,
            })
    }

    // ========================================================================
    // Operations (caller holds the gate)
    // ========================================================================

    async fn do_install(&self) -> LifecycleResult {
        if self.probe.exists(self.name()).await {
            return LifecycleResult::new(
                Outcome::AlreadyInstalled,
                format!("Service '{}' is already installed", self.name()),
            );
        }
        self.run_command(ControlAction::Create).await
    }

    async fn do_uninstall(&self) -> LifecycleResult {
        if !self.probe.exists(self.name()).await {
            return LifecycleResult::not_installed(self.name());
        }
        if self.probe.is_running(self.name()).await {
            return LifecycleResult::new(
                Outcome::StillRunning,
                format!(
                    "Service '{}' is running; stop it before uninstalling",
                    self.name()
                ),
            );
        }
        self.run_command(ControlAction::Delete).await
    }

    async fn do_start(&self) -> LifecycleResult {
        if !self.probe.exists(self.name()).await {
            return LifecycleResult::not_installed(self.name());
        }
        if self.probe.is_running(self.name()).await {
            return LifecycleResult::new(
                Outcome::AlreadyRunning,
                format!("Service '{}' is already running", self.name()),
            );
        }
        self.run_command(ControlAction::Start).await
    }

    async fn do_stop(&self) -> LifecycleResult {
        if !self.probe.is_running(self.name()).await {
            let message = if self.probe.exists(self.name()).await {
                format!("Service '{}' is not running", self.name())
            } else {
                format!("Service '{}' is not installed; nothing to stop", self.name())
            };
            return LifecycleResult::new(Outcome::NotRunning, message);
        }
        self.run_command(ControlAction::Stop).await
    }

    async fn do_restart(&self) -> LifecycleResult {
        if !self.probe.exists(self.name()).await {
            return LifecycleResult::not_installed(self.name());
        }

        let stopped = self.do_stop().await;
        if !stopped.success {
            return stopped;
        }

        if !sleep_or_cancelled(&self.cancel, self.settle_delay).await {
            tracing::warn!(
                service = %self.name(),
                "Restart interrupted during settle delay; service left stopped"
            );
            return LifecycleResult::cancelled(self.name(), LifecycleOp::Restart);
        }

        let started = self.do_start().await;
        if started.outcome == Outcome::Completed {
            LifecycleResult::completed(format!("Service '{}' restarted", self.name()))
        } else {
            started
        }
    }

    async fn run_command(&self, action: ControlAction) -> LifecycleResult {
        let command = self.backend.command(action, &self.descriptor);
        match self.runner.run(&command).await {
            Ok(result) => result,
            Err(e @ CommandError::Launch { .. }) => {
                LifecycleResult::new(Outcome::LaunchFailed, e.to_string())
            }
            Err(e @ CommandError::Timeout { .. }) => {
                LifecycleResult::new(Outcome::TimedOut, e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for ServiceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceController")
            .field("name", &self.descriptor.name)
            .field("busy", &self.is_busy())
            .field("cached", &self.cached_status())
            .field("settle_delay", &self.settle_delay)
            .finish()
    }
}
