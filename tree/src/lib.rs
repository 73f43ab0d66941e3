//! # Resource Tree
//!
//! This crate maintains the in-memory resource tree for a project: which
//! files and folders the project is known to contain, and a cached metadata
//! snapshot for each of them. The monitor asks this tree whether a resource
//! is still synchronized with the real filesystem and tells it to refresh
//! when it is not.
//!
//! - **`LogicalResource`**: a file or folder addressed by project-relative path
//! - **`ResourceTree`**: the contract consumed by the monitor
//!   (find / is-synchronized / refresh)
//! - **`ProjectTree`**: the cached-metadata implementation of that contract

pub mod error;
pub mod resource;
pub mod tree;

pub use error::{Result, TreeError};
pub use resource::{LogicalResource, ResourceKind};
pub use tree::{ProjectTree, ResourceTree};
