//! Error types for the refresh monitor.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur in the refresh monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The project has no local filesystem location to watch.
    #[error("project has no local filesystem location: {0}")]
    NoLocalFilesystem(String),

    /// A path does not lie under the project root.
    #[error("path outside the project root: {path} (root: {root})")]
    OutsideProject {
        /// The offending absolute path.
        path: PathBuf,

        /// The project root it was resolved against.
        root: PathBuf,
    },

    /// A non-overflow event arrived without an entry name.
    #[error("event carried no entry name (directory: {0})")]
    MissingEntryName(PathBuf),

    /// The worker did not terminate within the shutdown bound.
    #[error("monitor worker for {0} did not stop within the timeout")]
    ShutdownTimeout(String),

    /// A monitor is already installed for the project.
    #[error("project already monitored: {0}")]
    AlreadyMonitored(String),

    /// No monitor is installed for the project.
    #[error("project not monitored: {0}")]
    NotMonitored(String),

    /// Resource tree error.
    #[error("resource tree error: {0}")]
    Tree(#[from] resync_tree::TreeError),

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
