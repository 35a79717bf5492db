//! Reference management for RDB.
//!
//! This crate provides named references (branches, tags, HEAD) that point at
//! commits in the object store. References are the only mutable state in a
//! repository, so every update is atomic and branch updates are serialized
//! through lock files.
//!
//! # Architecture
//!
//! - **Branches** are mutable pointers to commit chain tips, stored as
//!   `refs/heads/<name>` files holding a bare commit hash.
//! - **Tags** are pointers under `refs/tags/`.
//! - **HEAD** names the current branch (`ref: refs/heads/<name>`) or holds a
//!   raw commit hash when detached. A symbolic HEAD whose branch file does
//!   not exist yet is an *unborn* branch.
//! - **Branch locks** (`locks/<branch>.lock`) serialize commits per branch.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`types`] -- Core ref types: [`Head`], [`BranchInfo`]
//! - [`traits`] -- The [`RefStore`] trait defining the storage interface
//! - [`names`] -- Branch name validation
//! - [`fs`] -- On-disk [`FsRefStore`]
//! - [`lock`] -- [`BranchLock`] guard
//! - [`memory`] -- In-memory [`InMemoryRefStore`] for tests

pub mod error;
pub mod fs;
pub mod lock;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, RefResult};
pub use fs::FsRefStore;
pub use lock::BranchLock;
pub use memory::InMemoryRefStore;
pub use names::{branch_ref, validate_branch_name};
pub use traits::RefStore;
pub use types::{BranchInfo, Head};
