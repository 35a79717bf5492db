//! Per-branch advisory locks.
//!
//! A lock is the file `<locks_dir>/<branch>.lock`, created exclusively and
//! holding the owner's pid. Whoever creates it owns the branch until the
//! [`BranchLock`] guard is dropped.
//!
//! A lock left behind by a process that died is reclaimed: its pid no longer
//! names a live process. A lock file without a pid is reclaimed once it is
//! older than [`UNREADABLE_GRACE`], since its writer crashed before writing.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{RefError, RefResult};
use crate::names::validate_branch_name;

const RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// How long a lock file with no readable pid is left alone.
pub const UNREADABLE_GRACE: Duration = Duration::from_secs(10);

/// Exclusive hold on a branch. Removes the lock file on drop.
#[derive(Debug)]
pub struct BranchLock {
    branch: String,
    path: PathBuf,
}

impl BranchLock {
    /// Acquire the lock for `branch`, retrying until `timeout` elapses.
    ///
    /// Fails with [`RefError::LockContention`] if another holder keeps the
    /// lock for the whole window.
    pub fn acquire(locks_dir: &Path, branch: &str, timeout: Duration) -> RefResult<Self> {
        validate_branch_name(branch)?;
        let path = locks_dir.join(format!("{branch}.lock"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    writeln!(file, "{}", std::process::id())?;
                    file.sync_all()?;
                    debug!(%branch, "acquired branch lock");
                    return Ok(Self {
                        branch: branch.to_string(),
                        path,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&path)? {
                        reclaim(&path, branch)?;
                        continue;
                    }
                    let waited = started.elapsed();
                    if waited >= timeout {
                        warn!(%branch, ?waited, "branch lock still held");
                        return Err(RefError::LockContention {
                            branch: branch.to_string(),
                            waited,
                        });
                    }
                    thread::sleep(RETRY_INTERVAL.min(timeout - waited));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Whether the lock at `path` was left by a holder that is gone.
fn is_stale(path: &Path) -> RefResult<bool> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if let Ok(pid) = contents.trim().parse::<u32>() {
        return Ok(!is_process_alive(pid));
    }
    let age = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.elapsed().ok())
        .unwrap_or_default();
    Ok(age >= UNREADABLE_GRACE)
}

fn reclaim(path: &Path, branch: &str) -> RefResult<()> {
    warn!(%branch, path = %path.display(), "removing stale branch lock");
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}/stat")).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

/// No portable liveness check; such locks are only reclaimed by hand.
#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}

impl Drop for BranchLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove branch lock");
            }
        }
    }
}
