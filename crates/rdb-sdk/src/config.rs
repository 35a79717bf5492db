//! Repository configuration stored at `.rdb/config`.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use rdb_index::IndexConfig;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{SdkError, SdkResult};

/// Working-tree layout recorded at init.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Tree,
    Flat,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tree => "tree",
            Self::Flat => "flat",
        })
    }
}

impl FromStr for Layout {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tree" => Ok(Self::Tree),
            "flat" => Ok(Self::Flat),
            other => Err(SdkError::InvalidConfig(format!(
                "unknown layout {other:?} (expected tree or flat)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default = "default_asset_root")]
    pub asset_root: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            asset_root: default_asset_root(),
        }
    }
}

fn default_asset_root() -> String {
    "assets".to_string()
}

/// Default commit author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub email: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: "RDB".to_string(),
            email: "rdb@localhost".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSection {
    /// 0 means one thread per core.
    pub hash_threads: usize,
}

/// Contents of `.rdb/config` (TOML).
///
/// ```toml
/// types = ["text", "audio"]
///
/// [core]
/// layout = "tree"
/// asset_root = "assets"
///
/// [user]
/// name = "RDB"
/// email = "rdb@localhost"
///
/// [lock]
/// timeout_ms = 5000
///
/// [index]
/// hash_threads = 0
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Declared asset types. Empty accepts anything without a warning.
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub index: IndexSection,
}

impl RepoConfig {
    pub fn new(layout: Layout, types: Vec<String>) -> Self {
        Self {
            types,
            core: CoreConfig {
                layout,
                ..CoreConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| SdkError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> SdkResult<()> {
        self.validate()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| SdkError::InvalidConfig(e.to_string()))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// The asset root must be a plain relative path outside `.rdb`.
    pub fn validate(&self) -> SdkResult<()> {
        let root = self.core.asset_root.as_str();
        let plain = !root.contains('\\')
            && root
                .split('/')
                .all(|c| !c.is_empty() && c != "." && c != "..");
        if !plain || root.split('/').next() == Some(".rdb") {
            return Err(SdkError::InvalidConfig(format!(
                "asset_root {root:?} must be a relative path outside .rdb"
            )));
        }
        if self.user.name.trim().is_empty() {
            return Err(SdkError::InvalidConfig("user.name is empty".into()));
        }
        Ok(())
    }

    /// `Name <email>`.
    pub fn author(&self) -> String {
        format!("{} <{}>", self.user.name, self.user.email)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock.timeout_ms)
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            asset_root: self.core.asset_root.clone(),
            hash_threads: self.index.hash_threads,
            declared_types: self.types.clone(),
        }
    }
}
