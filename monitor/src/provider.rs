//! Host-facing shim for installing and removing monitors.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use resync_tree::ResourceTree;

use crate::error::{MonitorError, Result};
use crate::monitor::{MonitoredProject, RefreshMonitor};

/// Installs one refresh monitor per project and tears them down on request.
#[derive(Default)]
pub struct RefreshProvider {
    monitors: HashMap<String, RefreshMonitor>,
}

impl RefreshProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            monitors: HashMap::new(),
        }
    }

    /// Install a monitor for a project.
    pub fn install_monitor(
        &mut self,
        project: &MonitoredProject,
        tree: Arc<dyn ResourceTree>,
    ) -> Result<()> {
        if self.monitors.contains_key(&project.name) {
            return Err(MonitorError::AlreadyMonitored(project.name.clone()));
        }

        let monitor = RefreshMonitor::start(project, tree)?;
        self.monitors.insert(project.name.clone(), monitor);
        Ok(())
    }

    /// Stop and remove the monitor for a project.
    pub async fn uninstall_monitor(&mut self, name: &str) -> Result<()> {
        let Some(monitor) = self.monitors.remove(name) else {
            return Err(MonitorError::NotMonitored(name.to_string()));
        };
        monitor.stop().await
    }

    /// Check whether a project currently has a monitor installed.
    pub fn is_monitored(&self, name: &str) -> bool {
        self.monitors.contains_key(name)
    }

    /// Stop every installed monitor. Failures are logged, not propagated;
    /// shutdown proceeds to the remaining monitors.
    pub async fn shutdown(&mut self) {
        for (name, monitor) in self.monitors.drain() {
            if let Err(err) = monitor.stop().await {
                warn!(project = %name, "failed to stop monitor: {err}");
            }
        }
    }
}
