//! Tree building and diffing for RDB.
//!
//! Commits reference a root [`Tree`](rdb_store::Tree). This crate builds
//! those trees deterministically and compares two of them without reading
//! more than it has to.
//!
//! # Key Types
//!
//! - [`build_tree`] / [`TreeBuilder`] -- write a flat or nested tree to the store
//! - [`diff_trees`] -- lock-step merge-join diff, expanding assets into file changes
//! - [`TreeDiff`] / [`TreeChange`] / [`ChangeKind`] -- path-ordered change list

pub mod builder;
pub mod error;
pub mod tree_diff;

pub use builder::{build_tree, empty_tree_id, TreeBuilder};
pub use error::{DiffError, DiffResult};
pub use tree_diff::{diff_trees, ChangeKind, TreeChange, TreeDiff};
