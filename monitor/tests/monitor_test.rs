//! End-to-end tests driving a real monitor against a project tree on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use resync_monitor::{MonitoredProject, RefreshMonitor};
use resync_tree::{LogicalResource, ProjectTree, ResourceTree};
use tempfile::TempDir;

/// Upper bound on how long a filesystem change may take to become
/// observable through the tree.
const QUIESCENCE: Duration = Duration::from_secs(2);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Poll until the resource reports synchronized or the quiescence bound
/// elapses.
async fn wait_for_sync(tree: &dyn ResourceTree, resource: &LogicalResource) -> bool {
    let deadline = Instant::now() + QUIESCENCE;
    loop {
        if tree.is_synchronized(resource) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Decorator counting how many refresh commands the monitor issues.
struct CountingTree {
    inner: ProjectTree,
    refreshes: AtomicUsize,
}

impl CountingTree {
    fn open(root: &Path) -> Result<Self> {
        Ok(Self {
            inner: ProjectTree::open(root)?,
            refreshes: AtomicUsize::new(0),
        })
    }

    fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl ResourceTree for CountingTree {
    fn find_resource(&self, relative: &Path) -> Option<LogicalResource> {
        self.inner.find_resource(relative)
    }

    fn is_synchronized(&self, resource: &LogicalResource) -> bool {
        self.inner.is_synchronized(resource)
    }

    fn refresh(&self, resource: &LogicalResource) -> resync_tree::Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.inner.refresh(resource)
    }
}

#[tokio::test]
async fn test_create_modify_delete_file() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let tree = Arc::new(ProjectTree::open(temp_dir.path())?);
    let project = MonitoredProject::new("create-modify-delete", temp_dir.path());
    let monitor = RefreshMonitor::start(&project, Arc::clone(&tree) as Arc<dyn ResourceTree>)?;

    let file = LogicalResource::file("test");

    // file creation
    fs::write(temp_dir.path().join("test"), b"test")?;
    assert!(wait_for_sync(tree.as_ref(), &file).await);

    // file modification
    fs::write(temp_dir.path().join("test"), b"modified to a different length")?;
    assert!(wait_for_sync(tree.as_ref(), &file).await);

    // file deletion
    fs::remove_file(temp_dir.path().join("test"))?;
    assert!(wait_for_sync(tree.as_ref(), &file).await);
    assert!(tree.find_resource(Path::new("test")).is_none());

    monitor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_nested_directory_watch_propagation() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let tree = Arc::new(ProjectTree::open(temp_dir.path())?);
    let project = MonitoredProject::new("nested-folders", temp_dir.path());
    let monitor = RefreshMonitor::start(&project, Arc::clone(&tree) as Arc<dyn ResourceTree>)?;

    // Created faster than the quiescence delay: the new directories must
    // start being watched without a monitor restart.
    fs::create_dir_all(temp_dir.path().join("lvl1/lvl2"))?;
    fs::write(temp_dir.path().join("lvl1/lvl2/test"), b"test")?;

    assert!(wait_for_sync(tree.as_ref(), &LogicalResource::folder("lvl1")).await);
    assert!(wait_for_sync(tree.as_ref(), &LogicalResource::folder("lvl1/lvl2")).await);
    assert!(wait_for_sync(tree.as_ref(), &LogicalResource::file("lvl1/lvl2/test")).await);

    // The nested directory really is watched: a later change inside it is
    // picked up too.
    fs::write(temp_dir.path().join("lvl1/lvl2/test"), b"rewritten with more bytes")?;
    assert!(wait_for_sync(tree.as_ref(), &LogicalResource::file("lvl1/lvl2/test")).await);

    // folder deletion
    fs::remove_dir_all(temp_dir.path().join("lvl1"))?;
    assert!(wait_for_sync(tree.as_ref(), &LogicalResource::folder("lvl1")).await);
    assert!(tree.find_resource(Path::new("lvl1/lvl2/test")).is_none());

    monitor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_no_spurious_refresh() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    fs::write(temp_dir.path().join("existing"), b"content")?;

    let tree = Arc::new(CountingTree::open(temp_dir.path())?);
    let project = MonitoredProject::new("quiet", temp_dir.path());
    let monitor = RefreshMonitor::start(&project, Arc::clone(&tree) as Arc<dyn ResourceTree>)?;

    // No filesystem change happens, so no refresh command may be issued.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(tree.refresh_count(), 0);

    monitor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_no_refresh_after_stop() -> Result<()> {
    init_tracing();
    let temp_dir = TempDir::new()?;
    let tree = Arc::new(CountingTree::open(temp_dir.path())?);
    let project = MonitoredProject::new("stopped", temp_dir.path());
    let monitor = RefreshMonitor::start(&project, Arc::clone(&tree) as Arc<dyn ResourceTree>)?;

    monitor.stop().await?;

    fs::write(temp_dir.path().join("after-stop"), b"x")?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(tree.refresh_count(), 0);
    assert!(!tree.is_synchronized(&LogicalResource::file("after-stop")));
    Ok(())
}
