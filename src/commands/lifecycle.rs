use crate::output::UserOutput;
use service_warden::{LifecycleOp, LifecycleResult, Orchestrator};

/// Run one lifecycle operation and print its message.
pub async fn run_lifecycle(
    orchestrator: &Orchestrator,
    op: LifecycleOp,
    service: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<LifecycleResult> {
    tracing::debug!(service, %op, "Running lifecycle command");
    let result = orchestrator.execute(service, op).await;

    if result.success {
        out.success(&result.message);
    } else {
        out.error(&result.message);
    }

    // Show where the service ended up; a failed command can still leave it changed.
    if let Ok(status) = orchestrator.status(service).await {
        out.status(&format!("Status: {}", status));
    }

    Ok(result)
}
