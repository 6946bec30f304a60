use super::database::run_db_health;
use super::heartbeat::run_heartbeat;
use super::wait::panic_message;
use super::{DatabaseSession, HttpPoller};
use crate::config::{WorkerConfig, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::error::Result;
use crate::eventlog::EventLog;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What happened when the supervisor was shut down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks still running when the join timeout expired. They were left to
    /// finish on their own.
    pub stragglers: Vec<String>,
    /// Tasks that ended by panicking.
    pub panicked: Vec<String>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.stragglers.is_empty() && self.panicked.is_empty()
    }
}

/// Runs the periodic background tasks of a managed service process.
///
/// All tasks share one [`CancellationToken`]. [`shutdown`](Self::shutdown)
/// cancels it and joins the tasks with a bounded timeout; tasks that miss
/// the deadline are reported, never aborted.
pub struct WorkerSupervisor {
    service: String,
    cancel: CancellationToken,
    tasks: Vec<(String, JoinHandle<()>)>,
    database: Option<Arc<DatabaseSession>>,
    shutdown_timeout: Duration,
    log: EventLog,
}

impl WorkerSupervisor {
    pub fn new(service: impl Into<String>, log: EventLog) -> Self {
        Self {
            service: service.into(),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
            database: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            log,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Build a supervisor and start every task `config` enables.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(service: impl Into<String>, config: &WorkerConfig, log: EventLog) -> Result<Self> {
        // Fallible setup happens before any task is spawned.
        let poller = match &config.http {
            Some(http) => Some((
                HttpPoller::new(http.url.clone(), http.timeout())?,
                http.interval(),
            )),
            None => None,
        };

        let mut supervisor =
            Self::new(service, log).with_shutdown_timeout(config.shutdown_timeout());

        supervisor.spawn_heartbeat(config.heartbeat_interval());

        if let Some((poller, interval)) = poller {
            supervisor.spawn_http_poller(poller, interval);
        }

        if let Some(db) = &config.database {
            let session = Arc::new(DatabaseSession::new(db.path.clone()));
            supervisor.spawn_database_health(session, db.query().to_string(), db.interval());
        }

        tracing::info!(
            service = %supervisor.service,
            tasks = ?supervisor.task_names(),
            "Worker tasks started"
        );
        Ok(supervisor)
    }

    pub fn spawn_heartbeat(&mut self, interval: Duration) {
        let fut = run_heartbeat(self.log.clone(), interval, self.cancel.clone());
        self.spawn("heartbeat", fut);
    }

    pub fn spawn_http_poller(&mut self, poller: HttpPoller, interval: Duration) {
        let fut = poller.run(self.log.clone(), interval, self.cancel.clone());
        self.spawn("http-poll", fut);
    }

    pub fn spawn_database_health(
        &mut self,
        session: Arc<DatabaseSession>,
        query: String,
        interval: Duration,
    ) {
        self.database = Some(Arc::clone(&session));
        let fut = run_db_health(session, query, self.log.clone(), interval, self.cancel.clone());
        self.spawn("db-health", fut);
    }

    /// Run an extra task under the shared token.
    pub fn spawn<F>(&mut self, name: &str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push((name.to_string(), tokio::spawn(fut)));
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Token observed by every task. Cancel it to stop them without joining.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Session used by the database health task, for ad hoc queries.
    pub fn database(&self) -> Option<Arc<DatabaseSession>> {
        self.database.clone()
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Names of tasks that have not finished yet.
    pub fn alive_tasks(&self) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Cancel every task and wait up to the shutdown timeout for them to exit.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + self.shutdown_timeout;
        let mut report = ShutdownReport::default();

        for (name, mut handle) in std::mem::take(&mut self.tasks) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => tracing::debug!("Worker task '{}' stopped", name),
                Ok(Err(e)) if e.is_panic() => {
                    let msg = panic_message(e.into_panic().as_ref());
                    tracing::error!("Worker task '{}' panicked: {}", name, msg);
                    report.panicked.push(name);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Worker task '{}' ended abnormally: {}", name, e);
                }
                Err(_) => report.stragglers.push(name),
            }
        }

        if !report.stragglers.is_empty() {
            tracing::warn!(
                service = %self.service,
                "Degraded shutdown: {} did not stop within {:?}",
                report.stragglers.join(", "),
                self.shutdown_timeout
            );
        }
        report
    }
}

impl Drop for WorkerSupervisor {
    fn drop(&mut self) {
        // Tasks not joined through shutdown still have to stop.
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for WorkerSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerSupervisor")
            .field("service", &self.service)
            .field("tasks", &self.task_names())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
