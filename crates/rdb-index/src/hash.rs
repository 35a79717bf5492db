//! Parallel content hashing for working-tree files.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use rayon::prelude::*;
use rdb_store::{Blob, ObjectKind, ObjectStore};
use rdb_types::ObjectId;
use tracing::trace;

use crate::error::{IndexError, IndexResult};

/// A file that needs hashing.
pub(crate) struct HashJob {
    /// Repository-relative path.
    pub path: String,
    pub abs: PathBuf,
}

pub(crate) struct Hashed {
    pub path: String,
    pub hash: ObjectId,
    pub size: u64,
    pub mtime: SystemTime,
}

/// Hash `jobs` on a pool of `threads` workers (0 picks rayon's default).
///
/// With a `store`, each file is also written as a blob.
pub(crate) fn hash_files(
    jobs: Vec<HashJob>,
    threads: usize,
    store: Option<&dyn ObjectStore>,
) -> IndexResult<Vec<Hashed>> {
    if jobs.is_empty() {
        return Ok(Vec::new());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| IndexError::ThreadPool(e.to_string()))?;

    pool.install(|| {
        jobs.into_par_iter()
            .map(|job| hash_one(job, store))
            .collect()
    })
}

fn hash_one(job: HashJob, store: Option<&dyn ObjectStore>) -> IndexResult<Hashed> {
    // Stat before reading so a concurrent write shows up as a stale mtime.
    let mtime = fs::metadata(&job.abs)?.modified()?;
    let data = fs::read(&job.abs)?;
    let size = data.len() as u64;
    let hash = match store {
        Some(store) => store.put(ObjectKind::Blob, data)?,
        None => Blob::id_for(&data),
    };
    trace!(path = %job.path, %hash, size, "hashed file");
    Ok(Hashed {
        path: job.path,
        hash,
        size,
        mtime,
    })
}
