//! Foundation types for RDB, the Resource Database version-control engine.
//!
//! Every other RDB crate depends on `rdb-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash)
//! - [`AssetId`] -- Numeric, revision-stable asset identifier

pub mod asset_id;
pub mod error;
pub mod object;

pub use asset_id::AssetId;
pub use error::TypeError;
pub use object::ObjectId;
