use super::{OrchestratorBuilder, ServiceController, StatusSynchronizer};
use crate::error::{Error, Result};
use crate::service::{
    LifecycleOp, LifecycleResult, ServiceDescriptor, ServiceStatus, StatusChange,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on waiting for the status synchronizer during cleanup.
const MONITORING_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// One row of the service overview.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    #[serde(flatten)]
    pub descriptor: ServiceDescriptor,
    /// Last polled status, `None` before the first poll.
    pub status: Option<ServiceStatus>,
    pub busy: bool,
    pub actions: Vec<LifecycleOp>,
}

/// Registry of managed services and entry point for every lifecycle call.
///
/// Owns one [`ServiceController`] per configured service and the
/// [`StatusSynchronizer`] that feeds their status caches. Callers hold the
/// orchestrator (usually in an `Arc`) and address services by name.
///
/// # Concurrency Model
///
/// - Operations on the same service are gated by that service's controller:
///   a second concurrent call gets `Busy`, never a queue slot
/// - Operations on different services are independent
/// - Status polling runs on its own task and never takes an operation gate
/// - One root [`CancellationToken`]; controllers and the synchronizer observe
///   child tokens, so [`cleanup`](Self::cleanup) stops everything
///
/// # Example
///
/// ```no_run
/// use service_warden::config::Parser;
/// use service_warden::Orchestrator;
///
/// # async fn example() -> Result<(), service_warden::Error> {
/// let config = Parser::new().load_config("warden.yaml")?;
/// let orchestrator = Orchestrator::builder().config(config).build()?;
///
/// let result = orchestrator.start("test-log").await;
/// println!("{}", result.message);
///
/// orchestrator.cleanup().await;
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    controllers: Vec<Arc<ServiceController>>,
    index: HashMap<String, usize>,
    synchronizer: Arc<StatusSynchronizer>,
    monitoring_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    cancellation_token: CancellationToken,
    /// Guard to ensure cleanup runs exactly once
    cleanup_started: AtomicBool,
}

impl Orchestrator {
    /// Create a builder for constructing an `Orchestrator` with a fluent API.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub(super) fn from_parts(
        controllers: Vec<Arc<ServiceController>>,
        synchronizer: StatusSynchronizer,
        cancellation_token: CancellationToken,
    ) -> Self {
        let index = controllers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name().to_string(), i))
            .collect();
        Self {
            controllers,
            index,
            synchronizer: Arc::new(synchronizer),
            monitoring_task: tokio::sync::Mutex::new(None),
            cancellation_token,
            cleanup_started: AtomicBool::new(false),
        }
    }

    /// Managed services in configuration order.
    pub fn services(&self) -> Vec<&ServiceDescriptor> {
        self.controllers.iter().map(|c| c.descriptor()).collect()
    }

    pub fn controller(&self, id: &str) -> Option<Arc<ServiceController>> {
        self.index.get(id).map(|&i| Arc::clone(&self.controllers[i]))
    }

    pub fn synchronizer(&self) -> Arc<StatusSynchronizer> {
        Arc::clone(&self.synchronizer)
    }

    // ========================================================================
    // Lifecycle commands
    // ========================================================================

    pub async fn install(&self, id: &str) -> LifecycleResult {
        self.execute(id, LifecycleOp::Install).await
    }

    pub async fn uninstall(&self, id: &str) -> LifecycleResult {
        self.execute(id, LifecycleOp::Uninstall).await
    }

    pub async fn start(&self, id: &str) -> LifecycleResult {
        self.execute(id, LifecycleOp::Start).await
    }

    pub async fn stop(&self, id: &str) -> LifecycleResult {
        self.execute(id, LifecycleOp::Stop).await
    }

    pub async fn restart(&self, id: &str) -> LifecycleResult {
        self.execute(id, LifecycleOp::Restart).await
    }

    /// Run `op` on service `id`. Unknown names get an `UnknownService` result.
    pub async fn execute(&self, id: &str, op: LifecycleOp) -> LifecycleResult {
        match self.controller(id) {
            Some(controller) => controller.execute(op).await,
            None => LifecycleResult::unknown_service(id),
        }
    }

    /// Run `op` on its own task so an interactive caller never waits on it.
    ///
    /// The gate is taken when the task runs, not at dispatch time.
    pub fn dispatch(&self, id: &str, op: LifecycleOp) -> JoinHandle<LifecycleResult> {
        let controller = self.controller(id);
        let id = id.to_string();
        tokio::spawn(async move {
            match controller {
                Some(controller) => controller.execute(op).await,
                None => LifecycleResult::unknown_service(&id),
            }
        })
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Live status of `id`, straight from the probe.
    pub async fn status(&self, id: &str) -> Result<ServiceStatus> {
        let controller = self
            .controller(id)
            .ok_or_else(|| Error::ServiceNotFound(id.to_string()))?;
        Ok(controller.probe_status().await)
    }

    /// Operations currently offered for `id`, from the cached status.
    pub fn available_actions(&self, id: &str) -> Result<Vec<LifecycleOp>> {
        self.controller(id)
            .map(|c| c.available_actions())
            .ok_or_else(|| Error::ServiceNotFound(id.to_string()))
    }

    /// Every service with its cached status, busy flag and offered actions.
    pub fn snapshot(&self) -> Vec<ServiceSnapshot> {
        self.controllers
            .iter()
            .map(|c| ServiceSnapshot {
                descriptor: c.descriptor().clone(),
                status: c.cached_status(),
                busy: c.is_busy(),
                actions: c.available_actions(),
            })
            .collect()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.synchronizer.subscribe()
    }

    /// Run one status pass now and return what changed.
    pub async fn refresh(&self) -> Vec<StatusChange> {
        self.synchronizer.poll_once().await
    }

    /// Start the periodic status synchronizer. Calling it again is a no-op.
    pub async fn start_monitoring(&self) {
        let mut task = self.monitoring_task.lock().await;
        if task.is_some() {
            return;
        }
        let synchronizer = Arc::clone(&self.synchronizer);
        let cancel = self.child_token();
        tracing::debug!(
            "Starting status synchronizer every {:?}",
            synchronizer.interval()
        );
        *task = Some(tokio::spawn(synchronizer.run(cancel)));
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn child_token(&self) -> CancellationToken {
        self.cancellation_token.child_token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Stop polling and reject further operations.
    ///
    /// A restart waiting in its settle delay returns `Cancelled`. Commands
    /// already running are not interrupted.
    pub async fn cleanup(&self) {
        // Use compare_exchange to ensure cleanup runs exactly once
        if self
            .cleanup_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Cleanup already in progress or completed, skipping");
            return;
        }

        tracing::debug!("Cleanup: canceling in-progress operations");
        self.cancellation_token.cancel();

        let handle = self.monitoring_task.lock().await.take();
        if let Some(handle) = handle {
            tracing::debug!("Cleanup: waiting for status synchronizer");
            match tokio::time::timeout(MONITORING_JOIN_TIMEOUT, handle).await {
                Ok(_) => tracing::debug!("Cleanup: status synchronizer stopped"),
                Err(_) => tracing::warn!("Cleanup: status synchronizer join timed out, continuing"),
            }
        }

        let busy: Vec<&str> = self
            .controllers
            .iter()
            .filter(|c| c.is_busy())
            .map(|c| c.name())
            .collect();
        if !busy.is_empty() {
            tracing::warn!("Cleanup: operations still in flight for {}", busy.join(", "));
        }
        tracing::debug!("Cleanup: complete");
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        // Synchronous drop can't await the synchronizer; cancel so it exits on its own.
        self.cancellation_token.cancel();
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("services", &self.index.keys().collect::<Vec<_>>())
            .field("synchronizer", &self.synchronizer)
            .field("cancelled", &self.cancellation_token.is_cancelled())
            .field(
                "cleanup_started",
                &self.cleanup_started.load(Ordering::Relaxed),
            )
            .finish()
    }
}
