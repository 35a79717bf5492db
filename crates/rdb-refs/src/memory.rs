//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] stores all refs in a `BTreeMap` protected by a
//! `RwLock`. It implements the full [`RefStore`] trait and is suitable for
//! unit tests and short-lived processes.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use rdb_types::ObjectId;

use crate::error::{RefError, RefResult};
use crate::names::validate_branch_name;
use crate::traits::RefStore;
use crate::types::Head;

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, ObjectId>>,
    head: RwLock<Option<Head>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose HEAD names an unborn `branch`.
    pub fn with_unborn(branch: &str) -> RefResult<Self> {
        let store = Self::new();
        store.set_head(branch)?;
        Ok(store)
    }
}

fn poisoned<T>(e: PoisonError<T>) -> RefError {
    RefError::Poisoned(e.to_string())
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> RefResult<Option<ObjectId>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs.get(name).copied())
    }

    fn write_ref(&self, name: &str, target: &ObjectId) -> RefResult<()> {
        if let Some(branch) = name.strip_prefix("refs/heads/") {
            validate_branch_name(branch)?;
        }
        let mut refs = self.refs.write().map_err(poisoned)?;
        refs.insert(name.to_string(), *target);
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> RefResult<bool> {
        let mut refs = self.refs.write().map_err(poisoned)?;
        Ok(refs.remove(name).is_some())
    }

    fn list_refs(&self, prefix: &str) -> RefResult<Vec<(String, ObjectId)>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), *v))
            .collect())
    }

    fn head(&self) -> RefResult<Option<Head>> {
        Ok(self.head.read().map_err(poisoned)?.clone())
    }

    fn set_head(&self, branch: &str) -> RefResult<()> {
        validate_branch_name(branch)?;
        *self.head.write().map_err(poisoned)? = Some(Head::Symbolic(branch.to_string()));
        Ok(())
    }

    fn set_head_detached(&self, commit: &ObjectId) -> RefResult<()> {
        *self.head.write().map_err(poisoned)? = Some(Head::Detached(*commit));
        Ok(())
    }
}
