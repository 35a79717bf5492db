use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Content hash naming a stored object.
///
/// A 256-bit BLAKE3 digest, written as 64 lowercase hex characters in
/// refs, object paths and JSON payloads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    pub const HEX_LEN: usize = 64;

    /// BLAKE3 of `data` as-is. Store IDs hash the framed object instead.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// All zeros; never the hash of real content.
    pub const fn null() -> Self {
        Self([0u8; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 8 hex characters, as printed by `log --oneline`.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Loose-object location: a two-character shard directory and the
    /// remaining 62 characters as the file name.
    pub fn shard(&self) -> (String, String) {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        (dir.to_string(), file.to_string())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Parses a full hex hash. Surrounding whitespace (a ref file's trailing
/// newline) is ignored.
impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != Self::HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: s.len(),
            });
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self(out))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_ref_file_contents() {
        let id = ObjectId::from_bytes(b"ref");
        let parsed: ObjectId = format!("{id}\n").parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_abbreviations_and_garbage() {
        let err = "abcd".parse::<ObjectId>().unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 64, actual: 4 });
        let bad = "zz".repeat(32);
        assert!(matches!(bad.parse::<ObjectId>(), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn shard_splits_after_two_chars() {
        let id = ObjectId::from_bytes(b"blob");
        let (dir, file) = id.shard();
        assert_eq!(dir.len(), 2);
        assert_eq!(file.len(), 62);
        assert_eq!(format!("{dir}{file}"), id.to_hex());
    }

    #[test]
    fn short_hex_is_a_prefix() {
        let id = ObjectId::from_bytes(b"test");
        assert!(id.to_hex().starts_with(&id.short_hex()));
        assert_eq!(id.short_hex().len(), 8);
    }

    #[test]
    fn null_differs_from_hashes() {
        assert_eq!(ObjectId::null().as_bytes(), &[0u8; 32]);
        assert_ne!(ObjectId::from_bytes(b""), ObjectId::null());
    }

    #[test]
    fn json_form_is_hex_string() {
        let id = ObjectId::from_bytes(b"serde test");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(serde_json::from_str::<ObjectId>(&json).unwrap(), id);
    }
}
