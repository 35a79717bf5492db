//! Core reference types.

use std::fmt;

use rdb_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::{RefError, RefResult};

/// Prefix of a symbolic HEAD file.
const SYMBOLIC_PREFIX: &str = "ref: refs/heads/";

/// The state of HEAD: either symbolic (pointing to a branch) or detached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Head {
    /// HEAD points to a branch by name. The branch may be unborn.
    Symbolic(String),
    /// HEAD is detached, pointing directly to a commit.
    Detached(ObjectId),
}

impl Head {
    /// Parse the contents of a HEAD file.
    pub fn parse(contents: &str) -> RefResult<Self> {
        let contents = contents.trim_end();
        if let Some(branch) = contents.strip_prefix(SYMBOLIC_PREFIX) {
            return Ok(Self::Symbolic(branch.to_string()));
        }
        contents
            .parse::<ObjectId>()
            .map(Self::Detached)
            .map_err(|e| RefError::Corrupt {
                name: "HEAD".into(),
                reason: format!("neither a symbolic ref nor a commit hash: {e}"),
            })
    }

    /// The branch HEAD points at, if symbolic.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Symbolic(branch) => Some(branch),
            Self::Detached(_) => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Detached(_))
    }
}

/// Renders the on-disk HEAD file format.
impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbolic(branch) => write!(f, "{SYMBOLIC_PREFIX}{branch}"),
            Self::Detached(id) => write!(f, "{id}"),
        }
    }
}

/// Summary information about a branch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Branch name.
    pub name: String,
    /// Commit at the branch tip.
    pub target: ObjectId,
    /// Whether this is the currently checked-out branch (HEAD points here).
    pub is_current: bool,
}
