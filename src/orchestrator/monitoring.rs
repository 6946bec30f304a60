//! Periodic status polling.
//!
//! [`StatusSynchronizer`] re-derives every service's status on a fixed tick,
//! diffs it against what it saw last time and publishes a [`StatusChange`]
//! for each difference. It only reads through the probe and writes the
//! controllers' status caches; it never calls a lifecycle operation, so a
//! slow install or restart can't stall the feed.

use super::ServiceController;
use crate::control::ServiceStatusProbe;
use crate::service::{ServiceStatus, StatusChange};
use crate::worker::panic_message;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Capacity of the status feed. Slow subscribers skip ahead (`Lagged`).
const FEED_CAPACITY: usize = 256;

pub struct StatusSynchronizer {
    controllers: Vec<Arc<ServiceController>>,
    probe: Arc<dyn ServiceStatusProbe>,
    interval: Duration,
    /// Held for a whole pass, so concurrent passes can't interleave their diffs.
    last_known: Mutex<HashMap<String, ServiceStatus>>,
    events: broadcast::Sender<StatusChange>,
}

impl StatusSynchronizer {
    pub fn new(
        controllers: Vec<Arc<ServiceController>>,
        probe: Arc<dyn ServiceStatusProbe>,
        interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            controllers,
            probe,
            interval,
            last_known: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Receive every change published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.events.subscribe()
    }

    pub async fn last_known(&self, service: &str) -> Option<ServiceStatus> {
        self.last_known.lock().await.get(service).copied()
    }

    /// Probe every service once, concurrently, and publish what changed.
    ///
    /// The first observation of a service is reported with `previous: None`.
    pub async fn poll_once(&self) -> Vec<StatusChange> {
        let mut last_known = self.last_known.lock().await;

        let probes = self.controllers.iter().map(|controller| {
            let probe = Arc::clone(&self.probe);
            let controller = Arc::clone(controller);
            async move {
                let status = probe.status(controller.name()).await;
                (controller, status)
            }
        });
        let observed = futures::future::join_all(probes).await;

        let mut changes = Vec::new();
        for (controller, status) in observed {
            controller.record_observed(status);
            let previous = last_known.insert(controller.name().to_string(), status);
            if previous != Some(status) {
                changes.push(StatusChange {
                    service: controller.name().to_string(),
                    previous,
                    current: status,
                });
            }
        }
        drop(last_known);

        for change in &changes {
            tracing::debug!(
                service = %change.service,
                "Status {} -> {}",
                change
                    .previous
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                change.current
            );
            // No receivers is fine.
            let _ = self.events.send(change.clone());
        }
        changes
    }

    /// Poll on every tick until `cancel` fires.
    ///
    /// A panicking pass is logged and the loop keeps going.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Status synchronizer shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let pass = AssertUnwindSafe(self.poll_once()).catch_unwind().await;
                    if let Err(panic_info) = pass {
                        tracing::error!(
                            "Status poll panicked: {}. Continuing polling...",
                            panic_message(panic_info.as_ref())
                        );
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for StatusSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusSynchronizer")
            .field("services", &self.controllers.len())
            .field("interval", &self.interval)
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}
