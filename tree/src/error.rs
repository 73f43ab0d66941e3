//! Error types for the resource tree.

use thiserror::Error;

/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors that can occur in the resource tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Resource not found in the tree.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// A path does not lie under the project root.
    #[error("path outside the project root: {0}")]
    OutsideRoot(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
