//! The cached project tree and its synchronization contract.
//!
//! `ProjectTree` remembers a metadata snapshot for every resource it has
//! seen. A resource is synchronized when the cached subtree below it matches
//! what is currently on disk; `refresh` re-scans the disk subtree and
//! replaces the cached snapshots.

use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::resource::{LogicalResource, ResourceKind};

/// The synchronization contract consumed by the monitor.
///
/// `is_synchronized` is the authoritative check: change notifications are
/// only a hint, so `refresh` must be idempotent and safe to call
/// redundantly.
pub trait ResourceTree: Send + Sync {
    /// Look up a resource the tree already knows about.
    fn find_resource(&self, relative: &Path) -> Option<LogicalResource>;

    /// Check whether the cached state for a resource and everything below
    /// it matches the real filesystem.
    fn is_synchronized(&self, resource: &LogicalResource) -> bool;

    /// Re-read the resource's subtree from disk and update the cached state.
    fn refresh(&self, resource: &LogicalResource) -> Result<()>;
}

/// Cached metadata for a single tree entry.
///
/// Directories deliberately carry no modification time: a directory is in
/// sync when its member set is, and its mtime changes whenever a child is
/// touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntrySnapshot {
    kind: ResourceKind,
    modified: Option<SystemTime>,
    len: u64,
}

impl EntrySnapshot {
    fn from_metadata(metadata: &Metadata) -> Self {
        if metadata.is_dir() {
            Self {
                kind: ResourceKind::Folder,
                modified: None,
                len: 0,
            }
        } else {
            Self {
                kind: ResourceKind::File,
                modified: metadata.modified().ok(),
                len: metadata.len(),
            }
        }
    }
}

/// A project's resource tree backed by cached filesystem snapshots.
///
/// Entries are keyed by path relative to the project root; the root folder
/// itself is the empty path.
pub struct ProjectTree {
    /// Absolute path to the project root. Immutable for the tree's lifetime.
    root: PathBuf,

    /// Snapshot for every known resource, keyed by relative path.
    entries: RwLock<HashMap<PathBuf, EntrySnapshot>>,
}

impl ProjectTree {
    /// Open the tree for a project root, scanning the existing contents so
    /// an untouched project starts fully synchronized.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let tree = Self {
            root: root.into(),
            entries: RwLock::new(HashMap::new()),
        };
        tree.refresh(&LogicalResource::project_root())?;
        debug!(
            root = %tree.root.display(),
            resources = tree.resource_count(),
            "opened project tree"
        );
        Ok(tree)
    }

    /// Absolute path of the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of resources currently known to the tree.
    pub fn resource_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Snapshot the disk subtree rooted at `relative`. Entries that cannot
    /// be read (permissions, vanished mid-walk) are skipped.
    fn scan_subtree(&self, relative: &Path) -> HashMap<PathBuf, EntrySnapshot> {
        let absolute = self.root.join(relative);
        let mut snapshots = HashMap::new();

        for entry in WalkDir::new(&absolute).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("skipping unreadable entry during scan: {err}");
                    continue;
                }
            };
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                warn!(path = %entry.path().display(), "scanned entry outside the project root");
                continue;
            };
            match entry.metadata() {
                Ok(metadata) => {
                    snapshots.insert(rel.to_path_buf(), EntrySnapshot::from_metadata(&metadata));
                }
                Err(err) => debug!(path = %rel.display(), "cannot read metadata: {err}"),
            }
        }

        snapshots
    }
}

impl ResourceTree for ProjectTree {
    fn find_resource(&self, relative: &Path) -> Option<LogicalResource> {
        self.entries.read().get(relative).map(|snapshot| LogicalResource {
            path: relative.to_path_buf(),
            kind: snapshot.kind,
        })
    }

    fn is_synchronized(&self, resource: &LogicalResource) -> bool {
        let disk = self.scan_subtree(&resource.path);
        let entries = self.entries.read();

        let mut cached = 0;
        for (rel, snapshot) in entries.iter() {
            if !rel.starts_with(&resource.path) {
                continue;
            }
            cached += 1;
            if disk.get(rel) != Some(snapshot) {
                return false;
            }
        }

        // Anything on disk the cache has not seen yet is also a divergence.
        disk.len() == cached
    }

    fn refresh(&self, resource: &LogicalResource) -> Result<()> {
        let disk = self.scan_subtree(&resource.path);
        let mut entries = self.entries.write();

        entries.retain(|rel, _| !rel.starts_with(&resource.path));
        let replaced = disk.len();
        entries.extend(disk);

        // Re-snapshot the chain of ancestors so a deep refresh leaves the
        // directories above it coherent.
        let mut ancestor = resource.path.parent();
        while let Some(dir) = ancestor {
            match std::fs::symlink_metadata(self.root.join(dir)) {
                Ok(metadata) => {
                    entries.insert(dir.to_path_buf(), EntrySnapshot::from_metadata(&metadata));
                }
                Err(_) => {
                    entries.remove(dir);
                }
            }
            ancestor = dir.parent();
        }

        debug!(path = %resource.path.display(), resources = replaced, "refreshed");
        Ok(())
    }
}
