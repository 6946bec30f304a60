use super::sleep_or_cancelled;
use crate::eventlog::{EventLog, Severity};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Write one informational entry every `interval` until cancelled.
///
/// The first entry is written after one full interval. A failed write is
/// reported through `tracing` and the loop keeps going.
pub(crate) async fn run_heartbeat(log: EventLog, interval: Duration, cancel: CancellationToken) {
    let mut beats: u64 = 0;
    while sleep_or_cancelled(&cancel, interval).await {
        beats += 1;
        let message = format!(
            "Heartbeat #{} - {}",
            beats,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        if let Err(e) = log.try_write(Severity::Info, &message) {
            tracing::error!("Failed to write heartbeat #{}: {}", beats, e);
        }
    }
    tracing::debug!("Heartbeat task stopped after {} beats", beats);
}
