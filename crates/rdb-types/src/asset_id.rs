use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Numeric identifier of an asset.
///
/// The ID is stable across revisions and names the asset's directory under
/// the asset root (`assets/<id>/`). Only ASCII digits are accepted when
/// parsing, so `"+12"` or `" 12"` are not asset IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl AssetId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` for a usable (positive) ID.
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidAssetId(s.to_string()));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| TypeError::InvalidAssetId(s.to_string()))
    }
}

impl From<u64> for AssetId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_digit_strings() {
        assert_eq!("1030002".parse::<AssetId>().unwrap(), AssetId(1030002));
    }

    #[test]
    fn rejects_signs_and_letters() {
        for bad in ["", "+12", "-1", "12a", "strings", " 12"] {
            assert!(bad.parse::<AssetId>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn zero_parses_but_is_invalid() {
        let id: AssetId = "0".parse().unwrap();
        assert!(!id.is_valid());
    }

    #[test]
    fn serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&AssetId(42)).unwrap(), "42");
    }
}
