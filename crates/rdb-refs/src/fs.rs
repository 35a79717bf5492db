//! On-disk reference store.
//!
//! Layout under the repository's `.rdb` directory:
//!
//! ```text
//! HEAD                  "ref: refs/heads/<branch>" or a raw commit hash
//! refs/heads/<branch>   commit hash, no trailing content
//! refs/tags/<tag>
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rdb_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{RefError, RefResult};
use crate::names::validate_branch_name;
use crate::traits::RefStore;
use crate::types::Head;

/// Ref store backed by files under a repository metadata directory.
#[derive(Debug, Clone)]
pub struct FsRefStore {
    root: PathBuf,
}

impl FsRefStore {
    /// Use `root` (the `.rdb` directory) as the ref namespace.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    fn ref_path(&self, name: &str) -> RefResult<PathBuf> {
        let rel = name
            .strip_prefix("refs/")
            .ok_or_else(|| RefError::NotFound {
                name: name.to_string(),
            })?;
        validate_branch_name(rel)?;
        Ok(self.root.join(name))
    }
}

/// Replace `path` with `contents` via a temp file and rename.
fn write_atomic(path: &Path, contents: &str) -> RefResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read_optional(path: &Path) -> RefResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_target(name: &str, contents: &str) -> RefResult<ObjectId> {
    contents.parse().map_err(|e| RefError::Corrupt {
        name: name.to_string(),
        reason: format!("{e}"),
    })
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> RefResult<Option<ObjectId>> {
        let path = self.ref_path(name)?;
        match read_optional(&path)? {
            Some(contents) => parse_target(name, &contents).map(Some),
            None => Ok(None),
        }
    }

    fn write_ref(&self, name: &str, target: &ObjectId) -> RefResult<()> {
        let path = self.ref_path(name)?;
        write_atomic(&path, &target.to_hex())?;
        debug!(%name, %target, "updated ref");
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> RefResult<bool> {
        let path = self.ref_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_refs(&self, prefix: &str) -> RefResult<Vec<(String, ObjectId)>> {
        let refs_dir = self.root.join("refs");
        if !refs_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&refs_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| match e.into_io_error() {
                Some(io) => RefError::Io(io),
                None => RefError::Corrupt {
                    name: "refs".into(),
                    reason: "directory loop".into(),
                },
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = rel
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect::<Vec<_>>()
                .join("/");
            if !name.starts_with(prefix) {
                continue;
            }
            let contents = fs::read_to_string(entry.path())?;
            out.push((name.clone(), parse_target(&name, &contents)?));
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn head(&self) -> RefResult<Option<Head>> {
        match read_optional(&self.head_path())? {
            Some(contents) => Head::parse(&contents).map(Some),
            None => Ok(None),
        }
    }

    fn set_head(&self, branch: &str) -> RefResult<()> {
        validate_branch_name(branch)?;
        write_atomic(&self.head_path(), &Head::Symbolic(branch.to_string()).to_string())
    }

    fn set_head_detached(&self, commit: &ObjectId) -> RefResult<()> {
        write_atomic(&self.head_path(), &Head::Detached(*commit).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(b: u8) -> ObjectId {
        ObjectId::from_hash([b; 32])
    }

    #[test]
    fn ref_file_holds_bare_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::new(dir.path());
        store.write_ref("refs/heads/main", &oid(1)).unwrap();

        let raw = fs::read_to_string(dir.path().join("refs/heads/main")).unwrap();
        assert_eq!(raw, oid(1).to_hex());
        assert_eq!(store.read_ref("refs/heads/main").unwrap(), Some(oid(1)));
    }

    #[test]
    fn head_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::new(dir.path());
        assert_eq!(store.head().unwrap(), None);

        store.set_head("main").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("HEAD")).unwrap(),
            "ref: refs/heads/main"
        );
        assert_eq!(store.resolve_head().unwrap(), None);

        store.set_head_detached(&oid(5)).unwrap();
        assert_eq!(store.head().unwrap(), Some(Head::Detached(oid(5))));
    }

    #[test]
    fn overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::new(dir.path());
        for b in 0..5 {
            store.write_ref("refs/heads/main", &oid(b)).unwrap();
        }
        let files: Vec<_> = fs::read_dir(dir.path().join("refs/heads")).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(store.read_ref("refs/heads/main").unwrap(), Some(oid(4)));
    }

    #[test]
    fn nested_branches_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::new(dir.path());
        store.write_ref("refs/heads/main", &oid(1)).unwrap();
        store.write_ref("refs/heads/feature/auth", &oid(2)).unwrap();
        store.write_ref("refs/tags/v1", &oid(3)).unwrap();

        let names: Vec<_> = store
            .list_refs("refs/heads/")
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, ["refs/heads/feature/auth", "refs/heads/main"]);
    }

    #[test]
    fn corrupt_ref_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::new(dir.path());
        fs::create_dir_all(dir.path().join("refs/heads")).unwrap();
        fs::write(dir.path().join("refs/heads/main"), "zzz").unwrap();
        assert!(matches!(
            store.read_ref("refs/heads/main"),
            Err(RefError::Corrupt { .. })
        ));
    }

    #[test]
    fn refuses_names_outside_refs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::new(dir.path());
        assert!(store.write_ref("HEAD", &oid(1)).is_err());
        assert!(store.write_ref("refs/heads/../../x", &oid(1)).is_err());
    }

    #[test]
    fn delete_missing_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::new(dir.path());
        assert!(!store.delete_ref("refs/heads/none").unwrap());
    }
}
