//! The [`RefStore`] trait defining the reference storage interface.

use rdb_types::ObjectId;

use crate::error::RefResult;
use crate::names::branch_ref;
use crate::types::{BranchInfo, Head};

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`) and make every write
/// atomic: a reader sees either the old target or the new one. The
/// namespace follows a hierarchical layout:
///
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
pub trait RefStore: Send + Sync {
    /// Read a ref by its canonical name (e.g. "refs/heads/main").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> RefResult<Option<ObjectId>>;

    /// Point the ref at `target`, creating it if needed.
    fn write_ref(&self, name: &str, target: &ObjectId) -> RefResult<()>;

    /// Delete a ref by canonical name.
    ///
    /// Returns `Ok(true)` if the ref existed and was deleted.
    fn delete_ref(&self, name: &str) -> RefResult<bool>;

    /// List all refs whose canonical name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> RefResult<Vec<(String, ObjectId)>>;

    /// Read the current HEAD state.
    ///
    /// Returns `Ok(None)` if HEAD has not been set.
    fn head(&self) -> RefResult<Option<Head>>;

    /// Set HEAD to point at a branch (symbolic ref).
    fn set_head(&self, branch: &str) -> RefResult<()>;

    /// Set HEAD to a detached state pointing directly to a commit.
    fn set_head_detached(&self, commit: &ObjectId) -> RefResult<()>;

    /// Tip of a branch, or `None` while the branch is unborn.
    fn branch_tip(&self, branch: &str) -> RefResult<Option<ObjectId>> {
        self.read_ref(&branch_ref(branch))
    }

    /// The commit HEAD resolves to, following a symbolic HEAD to its branch.
    ///
    /// `None` when HEAD is unset or names an unborn branch.
    fn resolve_head(&self) -> RefResult<Option<ObjectId>> {
        match self.head()? {
            Some(Head::Symbolic(branch)) => self.branch_tip(&branch),
            Some(Head::Detached(id)) => Ok(Some(id)),
            None => Ok(None),
        }
    }

    /// List all branches with their tips.
    fn branches(&self) -> RefResult<Vec<BranchInfo>> {
        let current = self.head()?.and_then(|h| h.branch().map(str::to_string));
        Ok(self
            .list_refs("refs/heads/")?
            .into_iter()
            .map(|(name, target)| {
                let name = name.trim_start_matches("refs/heads/").to_string();
                let is_current = current.as_deref() == Some(name.as_str());
                BranchInfo {
                    name,
                    target,
                    is_current,
                }
            })
            .collect())
    }
}
