//! The per-project monitor loop.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::event::ChangeEvent;
use crate::reconcile::EventReconciler;

/// Long-lived background worker for one monitored project.
///
/// Blocks until the next change event arrives, drains everything currently
/// buffered as one ordered batch, and forwards each event to the
/// reconciler. All reconciliation for a project is serialized here; there
/// is no internal concurrency.
pub struct MonitorLoop {
    project: String,
    rx: mpsc::Receiver<ChangeEvent>,
    reconciler: EventReconciler,
}

impl MonitorLoop {
    /// Create the loop over an event queue and a reconciler.
    pub fn new(project: String, rx: mpsc::Receiver<ChangeEvent>, reconciler: EventReconciler) -> Self {
        Self {
            project,
            rx,
            reconciler,
        }
    }

    /// Run until the notification channel closes.
    ///
    /// The blocking receive is the only suspension point; cancellation is
    /// observed there as channel closure. A batch once drained is always
    /// fully processed.
    pub async fn run(mut self) {
        info!(project = %self.project, "monitoring worker started");

        while let Some(first) = self.rx.recv().await {
            let mut batch = vec![first];
            while let Ok(event) = self.rx.try_recv() {
                batch.push(event);
            }

            debug!(project = %self.project, events = batch.len(), "processing changes");
            for event in &batch {
                // One bad event must not stop the loop.
                if let Err(err) = self.reconciler.handle(event) {
                    warn!(project = %self.project, "failed to reconcile event: {err}");
                }
            }
        }

        info!(project = %self.project, "monitoring worker stopped");
    }
}
