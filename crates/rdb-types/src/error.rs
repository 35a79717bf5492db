use thiserror::Error;

/// Parse failures for identifiers read from disk or the command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("object id is not hex: {0}")]
    InvalidHex(String),

    #[error("object id must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("not an asset id: {0:?}")]
    InvalidAssetId(String),
}
