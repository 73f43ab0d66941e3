//! Logical resources addressed by project-relative path.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of resource a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A regular file.
    File,

    /// A directory.
    Folder,
}

/// A file or folder in the project, addressed relative to the project root.
///
/// The project root itself is the folder with the empty relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalResource {
    /// Path relative to the project root.
    pub path: PathBuf,

    /// Whether this is a file or a folder.
    pub kind: ResourceKind,
}

impl LogicalResource {
    /// A file resource at the given relative path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ResourceKind::File,
        }
    }

    /// A folder resource at the given relative path.
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ResourceKind::Folder,
        }
    }

    /// The project root resource.
    pub fn project_root() -> Self {
        Self::folder(PathBuf::new())
    }

    /// Check if this resource is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == ResourceKind::Folder
    }
}
