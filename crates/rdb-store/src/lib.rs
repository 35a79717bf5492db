//! Content-addressed object storage for RDB.
//!
//! This crate implements a hash-keyed object store analogous to git's
//! `.git/objects/` directory. Every piece of history -- file contents, asset
//! records, directory trees, commits -- is stored as an immutable object
//! identified by the BLAKE3 hash of its framed encoding
//! `"<kind> <len>\0<payload>"`.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- name-sorted directory listing referencing other objects
//! - [`Commit`] -- snapshot record linking a tree to its parent commit
//! - asset records are encoded by `rdb-asset` through [`StoredObject::from_json`]
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- sharded loose objects under `.rdb/objects/`
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written and are never deleted.
//! 2. Writes are atomic: temp file then rename, so readers never see a torn object.
//! 3. Reads re-derive the hash and fail with an integrity error on mismatch.
//! 4. Missing objects and corrupt objects are distinct errors.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, Commit, EntryKind, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
