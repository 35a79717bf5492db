//! Package manifest: the read-side view packaging tools consume.

use chrono::{DateTime, Utc};
use rdb_asset::{Asset, PathEntry};
use rdb_types::{AssetId, ObjectId};
use serde::{Deserialize, Serialize};

use crate::commit::CommitInfo;

pub const MANIFEST_SCHEMA_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    pub commit: ManifestCommit,
    /// Ordered by asset ID.
    pub assets: Vec<ManifestAsset>,
}

/// Provenance of the packaged snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCommit {
    pub id: ObjectId,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub branch: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestAsset {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub id: AssetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathEntry>,
    pub etag: String,
}

impl From<&Asset> for ManifestAsset {
    fn from(asset: &Asset) -> Self {
        Self {
            asset_type: asset.asset_type.clone(),
            id: asset.id,
            name: asset.name.clone(),
            paths: asset.paths.clone(),
            etag: asset.etag.clone(),
        }
    }
}

impl Manifest {
    pub fn new<'a>(info: &CommitInfo, assets: impl IntoIterator<Item = &'a Asset>) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            created_at: Utc::now(),
            commit: ManifestCommit {
                id: info.id,
                author: info.commit.author.clone(),
                timestamp: info.commit.timestamp,
                message: info.commit.message.clone(),
                branch: info.commit.branch.clone(),
            },
            assets: assets.into_iter().map(ManifestAsset::from).collect(),
        }
    }

    /// Every blob the manifest references, in path order per asset.
    pub fn blob_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.assets
            .iter()
            .flat_map(|a| a.paths.iter().map(|p| &p.object))
    }
}
