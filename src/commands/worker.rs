use super::shutdown_signal;
use crate::output::UserOutput;
use service_warden::eventlog::{EventLog, EventSink, FileSink, TracingSink};
use service_warden::worker::WorkerSupervisor;
use service_warden::Config;

/// Service mode: run the worker tasks until SIGTERM/SIGINT.
pub async fn run_worker(
    config: &Config,
    service: Option<String>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let service = service
        .or_else(|| config.services.first().map(|s| s.name.clone()))
        .unwrap_or_else(|| "warden".to_string());

    let mut sinks: Vec<Box<dyn EventSink>> = vec![Box::new(TracingSink::new(service.clone()))];
    if let Some(path) = &config.worker.event_log {
        sinks.push(Box::new(FileSink::open(path, service.clone())?));
    }
    let log = EventLog::new(sinks);

    let supervisor = WorkerSupervisor::start(service.clone(), &config.worker, log.clone())?;
    log.write_service_started(&service);
    out.status(&format!(
        "Worker for '{}' running: {}",
        service,
        supervisor.task_names().join(", ")
    ));

    shutdown_signal().await?;
    tracing::info!(service = %service, "Shutdown signal received");

    let report = supervisor.shutdown().await;
    if !report.is_clean() {
        out.warning(&format!(
            "Worker shut down degraded (stragglers: [{}], panicked: [{}])",
            report.stragglers.join(", "),
            report.panicked.join(", ")
        ));
    }
    log.write_service_stopped(&service);
    Ok(())
}
