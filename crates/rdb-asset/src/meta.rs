use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use rdb_types::AssetId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::asset::{Asset, Dependency};
use crate::error::{AssetError, AssetResult};

/// File name of the per-asset metadata file inside `assets/<id>/`.
pub const META_FILE: &str = "meta";

/// Contents of an `assets/<id>/meta` file.
///
/// Every field is optional on disk. Values present here override what would
/// otherwise be inferred from the directory name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMeta {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl AssetMeta {
    /// Metadata describing an existing asset record.
    pub fn from_asset(asset: &Asset) -> Self {
        Self {
            asset_type: Some(asset.asset_type.clone()),
            id: Some(asset.id),
            name: asset.name.clone(),
            tags: asset.tags.clone(),
            version: asset.version,
            attributes: asset.attributes.clone(),
            dependencies: asset.dependencies.clone(),
        }
    }

    /// Read a meta file. A missing file is `Ok(None)`.
    pub fn read(path: &Path) -> AssetResult<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| AssetError::MalformedMeta {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Write the meta file atomically as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> AssetResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut json =
            serde_json::to_vec_pretty(self).map_err(|e| AssetError::Serialization(e.to_string()))?;
        json.push(b'\n');

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(path = %path.display(), "wrote asset meta");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AssetMeta::read(&dir.path().join(META_FILE)).unwrap().is_none());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1030002").join(META_FILE);
        let mut meta = AssetMeta {
            asset_type: Some("string".into()),
            id: Some(AssetId(1030002)),
            name: Some("DialogLine_Intro".into()),
            ..Default::default()
        };
        meta.attributes.insert("lang".into(), json!("en"));
        meta.write(&path).unwrap();

        assert_eq!(AssetMeta::read(&path).unwrap(), Some(meta));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"type\": \"string\""));
    }

    #[test]
    fn partial_meta_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(META_FILE);
        fs::write(&path, r#"{"name": "intro"}"#).unwrap();
        let meta = AssetMeta::read(&path).unwrap().unwrap();
        assert_eq!(meta.name.as_deref(), Some("intro"));
        assert!(meta.asset_type.is_none());

        let asset = Asset::from_meta(AssetId(1030002), &meta);
        assert_eq!(asset.asset_type, "string");
        assert_eq!(asset.name.as_deref(), Some("intro"));
    }

    #[test]
    fn type_override_wins_over_table() {
        let meta = AssetMeta {
            asset_type: Some("dialog".into()),
            ..Default::default()
        };
        assert_eq!(Asset::from_meta(AssetId(1030002), &meta).asset_type, "dialog");
    }

    #[test]
    fn garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(META_FILE);
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            AssetMeta::read(&path),
            Err(AssetError::MalformedMeta { .. })
        ));
    }
}
