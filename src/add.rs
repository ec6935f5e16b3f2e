//! `add`: stage one or more working-tree files. Each path must exist; the
//! blob is written to the object store *before* the index is updated, so
//! a crash between the two steps can never leave an index entry pointing
//! at a SHA that does not exist in the store.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{Error, Result};
use crate::index::{Index, StatData};
use crate::repo::Repository;

pub fn add(repo: &Repository, paths: &[String]) -> Result<()> {
    for path in paths {
        if !Path::new(path).exists() {
            return Err(Error::PathNotFound(path.clone()));
        }
    }

    let store = repo.object_store();
    let mut index = Index::read_from(&repo.index_path())?;

    for path in paths {
        let payload = fs::read(path).map_err(|e| Error::io(path, e))?;
        let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;

        let sha = store.write("blob", &payload)?;

        let executable = metadata.permissions().mode() & 0o111 != 0;
        let mode = if executable { 0o100755 } else { 0o100644 };
        let stat = StatData::from_metadata(&metadata);

        let index_path = normalize_path(path);
        index.add_entry(&index_path, sha, mode, stat);
    }

    index.write_to(&repo.index_path())
}

/// Index paths always use `/` separators and no leading `./`.
fn normalize_path(path: &str) -> String {
    path.strip_prefix("./").unwrap_or(path).replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::discover(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn add_missing_path_errors() {
        let (_dir, repo) = init_repo();
        let result = add(&repo, &["does_not_exist".to_string()]);
        assert!(matches!(result, Err(Error::PathNotFound(_))));
    }

    #[test]
    fn add_writes_blob_and_index_entry() {
        let (dir, repo) = init_repo();
        let file_path = dir.path().join("empty_test_file");
        fs::File::create(&file_path).unwrap();

        add(&repo, &[file_path.to_string_lossy().to_string()]).unwrap();

        let store = repo.object_store();
        assert!(store.exists("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"));

        let index = Index::read_from(&repo.index_path()).unwrap();
        assert_eq!(index.entries.len(), 1);
        assert_eq!(
            hex::encode(index.entries[0].sha),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn add_preserves_executable_bit() {
        let (dir, repo) = init_repo();
        let file_path = dir.path().join("script.sh");
        {
            let mut f = fs::File::create(&file_path).unwrap();
            f.write_all(b"#!/bin/sh\n").unwrap();
        }
        let mut perms = fs::metadata(&file_path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&file_path, perms).unwrap();

        add(&repo, &[file_path.to_string_lossy().to_string()]).unwrap();
        let index = Index::read_from(&repo.index_path()).unwrap();
        assert_eq!(index.entries[0].mode_str(), crate::object::MODE_EXEC);
    }
}
