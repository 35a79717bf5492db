use std::path::{Component, Path};

use rdb_types::AssetId;

use crate::meta::META_FILE;

/// A repository-relative path classified as belonging to an asset.
///
/// `<asset_root>/<digits>/<logical...>`. An empty `logical` means the path
/// names the asset directory itself.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetPath {
    pub asset_id: AssetId,
    pub logical: String,
}

impl AssetPath {
    /// Classify a `/`-separated repository-relative path.
    ///
    /// Returns `None` for anything that is not inside a positive numeric
    /// asset directory directly under `asset_root`. Files at the root itself,
    /// non-numeric or zero directories and paths outside the root all fail.
    pub fn parse(rel_path: &str, asset_root: &str) -> Option<Self> {
        let rest = rel_path.strip_prefix(asset_root)?;
        let rest = rest.strip_prefix('/')?;
        let (dir, logical) = match rest.split_once('/') {
            Some((dir, logical)) => (dir, logical.trim_end_matches('/')),
            None => (rest, ""),
        };
        let asset_id: AssetId = dir.parse().ok()?;
        if !asset_id.is_valid() {
            return None;
        }
        if logical.split('/').any(|c| c == "." || c == "..") {
            return None;
        }
        if !logical.is_empty() && logical.split('/').any(str::is_empty) {
            return None;
        }
        Some(Self {
            asset_id,
            logical: logical.to_string(),
        })
    }

    /// Returns `true` when the path names the asset directory.
    pub fn is_asset_dir(&self) -> bool {
        self.logical.is_empty()
    }

    /// Returns `true` for the asset's `meta` file, which is not content.
    pub fn is_meta(&self) -> bool {
        self.logical == META_FILE
    }

    /// The repository-relative path this was parsed from, normalized.
    pub fn repo_path(&self, asset_root: &str) -> String {
        if self.logical.is_empty() {
            format!("{asset_root}/{}", self.asset_id)
        } else {
            format!("{asset_root}/{}/{}", self.asset_id, self.logical)
        }
    }
}

/// Render a relative filesystem path with `/` separators.
///
/// Fails on absolute paths, parent references and non-UTF-8 names.
pub fn to_slash_path(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_asset_file() {
        let p = AssetPath::parse("assets/1030002/en.txt", "assets").unwrap();
        assert_eq!(p.asset_id, AssetId(1030002));
        assert_eq!(p.logical, "en.txt");
        assert!(!p.is_meta());
    }

    #[test]
    fn parses_nested_logical_path() {
        let p = AssetPath::parse("assets/42001/audio/music.mp3", "assets").unwrap();
        assert_eq!(p.logical, "audio/music.mp3");
        assert_eq!(p.repo_path("assets"), "assets/42001/audio/music.mp3");
    }

    #[test]
    fn asset_directory_has_empty_logical() {
        let p = AssetPath::parse("assets/7", "assets").unwrap();
        assert!(p.is_asset_dir());
        assert_eq!(AssetPath::parse("assets/7/", "assets"), Some(p));
    }

    #[test]
    fn meta_is_recognized() {
        assert!(AssetPath::parse("assets/7/meta", "assets").unwrap().is_meta());
    }

    #[test]
    fn rejects_non_asset_paths() {
        for bad in [
            "assets",
            "assets/readme.txt",
            "assets/strings/en.txt",
            "assets/+7/en.txt",
            "assets/0/x",
            "assets/000/x",
            "other/7/en.txt",
            "assetsx/7/en.txt",
            "assets/7/../8/en.txt",
            "assets/7/a//b",
        ] {
            assert!(AssetPath::parse(bad, "assets").is_none(), "{bad} should be rejected");
        }
    }

    #[test]
    fn honours_custom_root() {
        let p = AssetPath::parse("data/res/5/x.bin", "data/res").unwrap();
        assert_eq!(p.asset_id, AssetId(5));
    }

    #[test]
    fn slash_path_normalizes_components() {
        let path = Path::new("assets").join("7").join("en.txt");
        assert_eq!(to_slash_path(&path).as_deref(), Some("assets/7/en.txt"));
        assert_eq!(to_slash_path(Path::new("./assets")).as_deref(), Some("assets"));
        assert!(to_slash_path(Path::new("../x")).is_none());
    }
}
