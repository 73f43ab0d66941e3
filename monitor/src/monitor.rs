//! Monitor lifecycle: start and stop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use resync_tree::ResourceTree;

use crate::error::{MonitorError, Result};
use crate::event::ChangeEvent;
use crate::mapper::PathMapper;
use crate::reconcile::EventReconciler;
use crate::registry::{WatchRegistry, WatcherHandle};
use crate::worker::MonitorLoop;

/// How many change events may queue before overflow is signalled.
const EVENT_QUEUE_DEPTH: usize = 1024;

/// Bound on waiting for the worker to exit during stop.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// A project to be monitored.
///
/// Projects without a local filesystem location (virtual or remote
/// resources) cannot be watched.
#[derive(Debug, Clone)]
pub struct MonitoredProject {
    /// Project name, used as the monitor's identity.
    pub name: String,

    /// Absolute path of the project root, if the project is local.
    pub location: Option<PathBuf>,
}

impl MonitoredProject {
    /// A project rooted at a local filesystem location.
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: Some(location.into()),
        }
    }

    /// A project with no local filesystem location.
    pub fn without_location(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }
}

/// Handle to a running monitor, usable to stop it.
pub struct RefreshMonitor {
    project: String,
    watcher: WatcherHandle,
    worker: JoinHandle<()>,
}

impl RefreshMonitor {
    /// Start monitoring a project.
    ///
    /// Opens the notification channel, registers the whole project tree,
    /// and spawns the monitor worker. Fails without starting anything if
    /// the project has no local filesystem location.
    pub fn start(project: &MonitoredProject, tree: Arc<dyn ResourceTree>) -> Result<Self> {
        let Some(root) = project.location.clone() else {
            return Err(MonitorError::NoLocalFilesystem(project.name.clone()));
        };

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let backend = notify::recommended_watcher(event_forwarder(tx, root.clone()))?;
        let watcher: WatcherHandle = Arc::new(Mutex::new(Some(backend)));

        let mut registry = WatchRegistry::new(Arc::clone(&watcher));
        registry.register_tree(&root);
        info!(
            project = %project.name,
            root = %root.display(),
            folders = registry.watched_count(),
            "registered project tree"
        );

        let reconciler = EventReconciler::new(PathMapper::new(root), registry, tree);
        let worker = tokio::spawn(MonitorLoop::new(project.name.clone(), rx, reconciler).run());

        Ok(Self {
            project: project.name.clone(),
            watcher,
            worker,
        })
    }

    /// Name of the monitored project.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Stop the monitor.
    ///
    /// Closes the notification channel, which wakes the blocked worker,
    /// then waits for it to terminate. The channel is considered closed
    /// even when the join times out.
    pub async fn stop(self) -> Result<()> {
        let Self {
            project,
            watcher,
            worker,
        } = self;

        // Dropping the backend drops the event sender inside its callback,
        // closing the channel the worker blocks on.
        watcher.lock().take();

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, worker).await {
            Ok(_) => {
                info!(project = %project, "no longer monitored");
                Ok(())
            }
            Err(_) => Err(MonitorError::ShutdownTimeout(project)),
        }
    }
}

/// Convert raw notify callbacks into change events on the queue.
///
/// Runs on the notify backend's thread. A full queue turns the lost event
/// into an overflow marker instead of blocking the backend; the marker
/// itself may wait for a slot, bounded by the worker draining the queue.
fn event_forwarder(
    tx: mpsc::Sender<ChangeEvent>,
    root: PathBuf,
) -> impl Fn(notify::Result<notify::Event>) + Send + 'static {
    move |result| match result {
        Ok(raw) => {
            for event in ChangeEvent::from_notify(&raw) {
                match tx.try_send(event) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(root = %root.display(), "event queue full, signalling overflow");
                        let _ = tx.blocking_send(ChangeEvent::overflow(root.clone()));
                        // Whatever else this raw event carried is part of
                        // the lost set the overflow marker stands in for.
                        break;
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => return,
                }
            }
        }
        Err(err) => {
            error!(root = %root.display(), "watch error: {err}");
        }
    }
}
