//! Watch registration over a directory tree.
//!
//! The notification backend only reports entries directly inside a watched
//! directory, so recursion is achieved by registering every directory
//! individually. The registry grows as new directories appear and never
//! shrinks: registrations for deleted directories simply stop producing
//! events and are never dereferenced, because lookups are keyed by absolute
//! paths recomputed per event.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;

/// Shared handle to the notify backend. Taking the watcher out of the
/// `Option` drops the event sender inside it, which closes the notification
/// channel and wakes the blocked monitor loop.
pub type WatcherHandle = Arc<Mutex<Option<RecommendedWatcher>>>;

/// Owns the live set of watched directories.
pub struct WatchRegistry {
    watcher: WatcherHandle,
    watched: HashSet<PathBuf>,
}

impl WatchRegistry {
    /// Create a registry over a shared notify backend.
    pub fn new(watcher: WatcherHandle) -> Self {
        Self {
            watcher,
            watched: HashSet::new(),
        }
    }

    /// Register `root` and every directory below it.
    ///
    /// A directory that fails to register (permissions, vanished mid-walk)
    /// is logged and skipped; the rest of the walk continues.
    pub fn register_tree(&mut self, root: &Path) {
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("cannot access folder during registration: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if let Err(err) = self.register_one(entry.path()) {
                warn!(path = %entry.path().display(), "cannot watch folder: {err}");
            }
        }
    }

    /// Register a single directory for create/modify/delete notifications
    /// on its direct entries.
    ///
    /// Idempotent: registering an already-registered directory is harmless,
    /// and registration after the channel has been closed is a no-op.
    pub fn register_one(&mut self, dir: &Path) -> Result<()> {
        if self.watched.contains(dir) {
            return Ok(());
        }

        let mut guard = self.watcher.lock();
        let Some(watcher) = guard.as_mut() else {
            debug!(path = %dir.display(), "watch channel closed, skipping registration");
            return Ok(());
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        drop(guard);

        self.watched.insert(dir.to_path_buf());
        debug!(path = %dir.display(), "watching");
        Ok(())
    }

    /// Number of directories currently registered.
    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }
}
