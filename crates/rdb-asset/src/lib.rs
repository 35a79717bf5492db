//! Asset metadata model for RDB.
//!
//! An asset is a typed, ID-keyed group of files living under
//! `assets/<id>/`. This crate owns everything that knows what an asset *is*:
//!
//! - [`Asset`] -- the record stored as an `asset` object in commits
//! - [`resolve_type`] -- the built-in numeric ID to type-name table
//! - [`validate`] -- structural and referential checks run before commit
//! - [`compute_etag`] -- content fingerprint used for cheap change detection
//! - [`AssetMeta`] -- the on-disk `meta` file that overrides inferred values
//! - [`AssetPath`] -- classification of repository paths into asset files

pub mod asset;
pub mod error;
pub mod meta;
pub mod path;
pub mod types;

pub use asset::{compute_etag, validate, Asset, Dependency, PathEntry};
pub use error::{AssetError, AssetResult};
pub use meta::{AssetMeta, META_FILE};
pub use path::{to_slash_path, AssetPath};
pub use types::{builtin_types, resolve_type, UNKNOWN_TYPE};
