use chrono::{DateTime, Utc};
use rdb_store::Commit;
use rdb_types::ObjectId;
use serde::{Deserialize, Serialize};

/// Parameters for [`Rdb::commit`](crate::Rdb::commit).
#[derive(Clone, Debug, Default)]
pub struct CommitRequest {
    pub message: String,
    /// Overrides the configured `user` author.
    pub author: Option<String>,
    /// Replace the branch tip instead of adding a child. The old tip is
    /// left unreferenced.
    pub amend: bool,
}

impl CommitRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn amend(mut self) -> Self {
        self.amend = true;
        self
    }
}

/// A commit together with the ID it is stored under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: ObjectId,
    #[serde(flatten)]
    pub commit: Commit,
}

impl CommitInfo {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.commit.message.lines().next().unwrap_or("")
    }
}

/// Filters for [`Rdb::log`](crate::Rdb::log).
///
/// The walk follows parent links; timestamps only filter. Commits newer
/// than `until` are skipped, and the walk stops at the first commit older
/// than `since`.
#[derive(Clone, Debug, Default)]
pub struct LogQuery {
    /// Defaults to HEAD.
    pub start: Option<ObjectId>,
    /// 0 means unlimited.
    pub max_count: usize,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }
}
