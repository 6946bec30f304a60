use super::{Orchestrator, ServiceController, StatusSynchronizer};
use crate::config::{validate_service_name, Config, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY};
use crate::control::fake::FakeServiceHost;
use crate::control::{BackendKind, CommandRunner, ControlBackend, ServiceStatusProbe};
use crate::error::{Error, Result};
use crate::service::ServiceDescriptor;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builder for constructing an `Orchestrator` with a fluent API.
///
/// With a [`Config`] the builder takes services, backend, timeouts and the
/// system runner/probe from it. Every piece can be overridden, which is how
/// tests swap in a [`FakeServiceHost`].
///
/// # Example
///
/// ```
/// use service_warden::control::fake::FakeServiceHost;
/// use service_warden::service::ServiceDescriptor;
/// use service_warden::Orchestrator;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let host = Arc::new(FakeServiceHost::new());
/// let orchestrator = Orchestrator::builder()
///     .service(ServiceDescriptor::new("api", "API", "", "/usr/bin/api"))
///     .fake_host(host)
///     .settle_delay(Duration::from_millis(10))
///     .build()
///     .unwrap();
/// assert_eq!(orchestrator.services().len(), 1);
/// ```
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: Option<Config>,
    services: Vec<ServiceDescriptor>,
    runner: Option<Arc<dyn CommandRunner>>,
    probe: Option<Arc<dyn ServiceStatusProbe>>,
    backend: Option<ControlBackend>,
    settle_delay: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take services and settings from `config`. The config is validated in `build`.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Add a service in addition to any from the config.
    pub fn service(mut self, descriptor: ServiceDescriptor) -> Self {
        self.services.push(descriptor);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ServiceStatusProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Use one in-memory host as both runner and probe.
    pub fn fake_host(self, host: Arc<FakeServiceHost>) -> Self {
        let runner: Arc<dyn CommandRunner> = host.clone();
        self.runner(runner).probe(host)
    }

    pub fn backend(mut self, backend: ControlBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Pause between stop and start inside restart (default 2s).
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    /// Status polling interval (default 1s).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Build the orchestrator. Monitoring is not started.
    pub fn build(self) -> Result<Orchestrator> {
        if let Some(config) = &self.config {
            config.validate()?;
        }

        let mut descriptors = self
            .config
            .as_ref()
            .map(Config::descriptors)
            .unwrap_or_default();
        descriptors.extend(self.services);

        if descriptors.is_empty() {
            return Err(Error::Validation("No services to manage".to_string()));
        }
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            validate_service_name(&descriptor.name)?;
            if !seen.insert(descriptor.name.clone()) {
                return Err(Error::Validation(format!(
                    "Service '{}' is registered more than once",
                    descriptor.name
                )));
            }
        }

        let config = self.config.as_ref();
        let runner: Arc<dyn CommandRunner> = match self.runner {
            Some(runner) => runner,
            None => Arc::new(config.map(Config::command_runner).unwrap_or_default()),
        };
        let probe: Arc<dyn ServiceStatusProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(config.map(Config::status_probe).unwrap_or_else(|| {
                crate::control::SystemProbe::new(
                    BackendKind::Auto,
                    crate::control::DEFAULT_PROBE_TIMEOUT,
                )
            })),
        };
        let backend = self.backend.unwrap_or_else(|| {
            config
                .map(Config::control_backend)
                .unwrap_or_else(|| ControlBackend::new(BackendKind::Auto))
        });
        let settle_delay = self
            .settle_delay
            .or_else(|| config.map(Config::settle_delay))
            .unwrap_or(DEFAULT_SETTLE_DELAY);
        let poll_interval = self
            .poll_interval
            .or_else(|| config.map(Config::poll_interval))
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        if poll_interval.is_zero() {
            return Err(Error::Validation(
                "poll_interval must be greater than zero".to_string(),
            ));
        }

        let root = CancellationToken::new();
        let controllers: Vec<Arc<ServiceController>> = descriptors
            .into_iter()
            .map(|descriptor| {
                Arc::new(
                    ServiceController::new(
                        descriptor,
                        Arc::clone(&runner),
                        Arc::clone(&probe),
                        backend.clone(),
                    )
                    .with_settle_delay(settle_delay)
                    .with_cancellation(root.child_token()),
                )
            })
            .collect();

        let synchronizer = StatusSynchronizer::new(controllers.clone(), probe, poll_interval);

        tracing::debug!(
            services = controllers.len(),
            backend = %backend.kind(),
            "Orchestrator built"
        );
        Ok(Orchestrator::from_parts(controllers, synchronizer, root))
    }
}
