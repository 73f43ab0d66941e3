//! Event-to-resource reconciliation policy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error};

use resync_tree::{LogicalResource, ResourceTree};

use crate::error::{MonitorError, Result};
use crate::event::{ChangeEvent, ChangeKind};
use crate::mapper::PathMapper;
use crate::registry::WatchRegistry;

/// Maps a single change event to the affected logical resource and decides
/// whether the tree needs a refresh.
pub struct EventReconciler {
    mapper: PathMapper,
    registry: WatchRegistry,
    tree: Arc<dyn ResourceTree>,
}

impl EventReconciler {
    /// Create a reconciler for a project.
    pub fn new(mapper: PathMapper, registry: WatchRegistry, tree: Arc<dyn ResourceTree>) -> Self {
        Self {
            mapper,
            registry,
            tree,
        }
    }

    /// Reconcile one change event against the resource tree.
    pub fn handle(&mut self, event: &ChangeEvent) -> Result<()> {
        if event.kind == ChangeKind::Overflow {
            return self.recover_from_overflow();
        }

        let Some(name) = event.name.as_deref() else {
            return Err(MonitorError::MissingEntryName(event.dir.clone()));
        };
        let absolute = event.dir.join(name);
        let relative = self.mapper.relative_of(&absolute)?;

        debug!(kind = ?event.kind, path = %relative.display(), "change event");

        let resource = match self.tree.find_resource(&relative) {
            Some(resource) => resource,
            None if event.kind == ChangeKind::Deleted => {
                // Already absent on both sides, nothing to reconcile.
                debug!(path = %relative.display(), "deleted and not in the tree");
                return Ok(());
            }
            None => self.synthesize(&absolute, relative, event.kind),
        };

        self.reconcile(&resource)
    }

    /// Prepare a resource the tree does not know about yet.
    ///
    /// A newly created directory must start being watched before the
    /// refresh, otherwise changes to its future children are invisible. The
    /// registration walks the new subtree: descendants created before the
    /// watch existed are picked up by the same walk.
    fn synthesize(&mut self, absolute: &Path, relative: PathBuf, kind: ChangeKind) -> LogicalResource {
        if absolute.is_dir() {
            if kind == ChangeKind::Created {
                self.registry.register_tree(absolute);
            }
            LogicalResource::folder(relative)
        } else {
            LogicalResource::file(relative)
        }
    }

    /// Refresh only when the authoritative synchronization check says the
    /// cached state is stale. Duplicate deliveries reconcile to a no-op.
    fn reconcile(&self, resource: &LogicalResource) -> Result<()> {
        if self.tree.is_synchronized(resource) {
            debug!(path = %resource.path.display(), "already synchronized");
            return Ok(());
        }

        debug!(path = %resource.path.display(), "not synchronized, refreshing");
        self.tree.refresh(resource)?;
        Ok(())
    }

    /// Overflow means an unknown set of changes was dropped. Re-register the
    /// whole tree to pick up directories created during the gap, then
    /// deep-check the project root.
    fn recover_from_overflow(&mut self) -> Result<()> {
        let root = self.mapper.root().to_path_buf();
        error!(root = %root.display(), "overflow detected, events were dropped");

        self.registry.register_tree(&root);
        self.reconcile(&LogicalResource::project_root())
    }
}
