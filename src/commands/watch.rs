use super::shutdown_signal;
use crate::output::UserOutput;
use service_warden::Orchestrator;
use tokio::sync::broadcast::error::RecvError;

/// Print every status change until Ctrl-C.
pub async fn run_watch(orchestrator: &Orchestrator, out: &dyn UserOutput) -> anyhow::Result<()> {
    // Subscribe before the first pass so initial statuses are printed too.
    let mut changes = orchestrator.subscribe();
    orchestrator.start_monitoring().await;

    out.status(&format!(
        "Watching {} service(s). Press Ctrl-C to exit.",
        orchestrator.services().len()
    ));
    out.blank();

    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            result = &mut signal => {
                result?;
                break;
            }
            change = changes.recv() => match change {
                Ok(change) => {
                    let timestamp = chrono::Local::now().format("%H:%M:%S");
                    match change.previous {
                        Some(previous) => out.status(&format!(
                            "[{}] {}: {} -> {}",
                            timestamp, change.service, previous, change.current
                        )),
                        None => out.status(&format!(
                            "[{}] {}: {}",
                            timestamp, change.service, change.current
                        )),
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    out.warning(&format!("Missed {} status changes", missed));
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    out.blank();
    out.status("Stopping watch...");
    orchestrator.cleanup().await;
    Ok(())
}
