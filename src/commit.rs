//! `commit-tree` and `commit`: compose a commit object referencing a tree
//! and zero or more parents, then (for `commit`) advance `HEAD`.

use chrono::Local;

use crate::error::Result;
use crate::object::{Commit, Object};
use crate::object_store::ObjectStore;
use crate::repo::{IdentityProvider, Repository};
use crate::write_tree::write_tree;

/// Build and write a commit object. `tree` and each entry of `parents` must
/// already be full 40-hex ids.
pub fn write_commit(
    store: &ObjectStore,
    identity: &dyn IdentityProvider,
    tree: String,
    parents: Vec<String>,
    message: String,
) -> Result<[u8; 20]> {
    let (name, email) = identity.identity()?;
    let (time, tz) = current_time_and_offset();
    let identity_line = format!("{name} <{email}>");

    let commit = Commit {
        tree,
        parents,
        author: identity_line.clone(),
        author_time: time,
        author_tz: tz.clone(),
        committer: identity_line,
        committer_time: time,
        committer_tz: tz,
        message,
    };
    Object::Commit(commit).write(store)
}

/// `commit -m <msg>`: run `write-tree`, commit against current `HEAD`
/// (if any), and advance `HEAD`.
pub fn commit(repo: &Repository, identity: &dyn IdentityProvider, message: String) -> Result<[u8; 20]> {
    let tree_sha = write_tree(repo)?;
    let store = repo.object_store();
    let parents = match repo.get_head_rev()? {
        Some(sha) => vec![sha],
        None => Vec::new(),
    };
    let sha = write_commit(&store, identity, hex::encode(tree_sha), parents, message)?;
    repo.update_head_rev(&hex::encode(sha))?;
    Ok(sha)
}

fn current_time_and_offset() -> (i64, String) {
    let now = Local::now();
    let time = now.timestamp();
    let offset_seconds = now.offset().local_minus_utc();
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    let magnitude = offset_seconds.unsigned_abs();
    let hours = magnitude / 3600;
    let minutes = (magnitude % 3600) / 60;
    let tz = format!("{sign}{hours:02}{minutes:02}");
    (time, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::FixedIdentity;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::discover(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn commit_tree_with_no_parent_omits_parent_header() {
        let (_dir, repo) = init_repo();
        let store = repo.object_store();
        let identity = FixedIdentity("Alice".into(), "alice@example.com".into());
        let empty_tree = Object::Tree(vec![]).write(&store).unwrap();
        let sha = write_commit(
            &store,
            &identity,
            hex::encode(empty_tree),
            Vec::new(),
            "Initial commit".into(),
        )
        .unwrap();
        let (kind, payload) = store.read(&hex::encode(sha)).unwrap();
        assert_eq!(kind, "commit");
        let text = String::from_utf8(payload).unwrap();
        assert!(!text.contains("parent "));
        assert!(text.contains("Alice <alice@example.com>"));
    }

    #[test]
    fn commit_advances_head() {
        let (dir, repo) = init_repo();
        let identity = FixedIdentity("Bob".into(), "bob@example.com".into());
        std::fs::write(dir.path().join("a.txt"), b"hi\n").unwrap();
        crate::add::add(&repo, &[dir.path().join("a.txt").to_string_lossy().to_string()]).unwrap();

        assert_eq!(repo.get_head_rev().unwrap(), None);
        let sha = commit(&repo, &identity, "first".into()).unwrap();
        assert_eq!(repo.get_head_rev().unwrap(), Some(hex::encode(sha)));

        let second = commit(&repo, &identity, "second".into()).unwrap();
        let (_, payload) = repo.object_store().read(&hex::encode(second)).unwrap();
        let text = String::from_utf8(payload).unwrap();
        assert!(text.contains(&format!("parent {}", hex::encode(sha))));
    }
}
