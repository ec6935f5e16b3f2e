//! `write-tree`: walks the index's cache-tree, recomputing invalid subtrees
//! bottom-up and stamping each synthesised tree's SHA back into the
//! cache-tree. Re-running with no mutations writes nothing and reprints the
//! cached root SHA (§4.6).

use crate::cache_tree::CacheTreeNode;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::object::{Object, TreeEntry};
use crate::object_store::ObjectStore;
use crate::repo::Repository;

/// Run the full `write-tree` algorithm of §4.6 and return the root tree SHA.
pub fn write_tree(repo: &Repository) -> Result<[u8; 20]> {
    let mut index = Index::read_from(&repo.index_path())?;
    let store = repo.object_store();

    let root = index.cache_tree.get_or_insert_with(CacheTreeNode::root);

    // Step 1-2: N = directories present in the index but missing as
    // cache-tree nodes; create INVALID stubs for them.
    let all_dirs = index.all_directories();
    for dir in &all_dirs {
        root.ensure_path(dir);
    }

    // Step 4: T = invalid dirs (new stubs are invalid by construction, so
    // this already covers N ∪ U); sort then reverse (deepest first, stable
    // so siblings keep name order).
    let mut invalid_dirs: Vec<String> = all_dirs
        .into_iter()
        .filter(|d| !index.cache_tree.as_ref().unwrap().find(d).unwrap().is_valid())
        .collect();
    invalid_dirs.sort();
    invalid_dirs.reverse();

    if invalid_dirs.is_empty() {
        let sha = index
            .cache_tree
            .as_ref()
            .and_then(|t| t.sha)
            .ok_or_else(|| Error::corrupt(None, "root cache-tree node has no cached SHA"))?;
        return Ok(sha);
    }

    // Step 5: bottom-up materialisation.
    for dir in &invalid_dirs {
        let sha = build_tree_for_dir(&index, &store, dir)?;
        let blob_count = index.get_blobs(dir).len();
        index
            .cache_tree
            .as_mut()
            .unwrap()
            .update_tree_entry(dir, sha, blob_count)?;
    }

    // Step 6: persist the updated cache-tree.
    index.write_to(&repo.index_path())?;

    let root_sha = index
        .cache_tree
        .as_ref()
        .and_then(|t| t.sha)
        .ok_or_else(|| Error::corrupt(None, "root cache-tree node has no cached SHA"))?;
    Ok(root_sha)
}

fn build_tree_for_dir(index: &Index, store: &ObjectStore, dir: &str) -> Result<[u8; 20]> {
    let mut entries: Vec<TreeEntry> = index
        .get_blobs(dir)
        .into_iter()
        .map(|e| TreeEntry {
            mode: e.mode_str().to_string(),
            name: e.file_name().to_string(),
            sha: e.sha,
        })
        .collect();

    let cache_tree = index.cache_tree.as_ref().unwrap();
    for sub_name in cache_tree.get_subtrees(dir) {
        let sub_path = if dir.is_empty() {
            sub_name.clone()
        } else {
            format!("{dir}/{sub_name}")
        };
        let sub_node = cache_tree
            .find(&sub_path)
            .ok_or_else(|| Error::corrupt(None, format!("missing cache-tree node '{sub_path}'")))?;
        let sha = sub_node
            .sha
            .ok_or_else(|| Error::corrupt(None, format!("cache-tree node '{sub_path}' is invalid")))?;
        entries.push(TreeEntry {
            mode: crate::object::MODE_TREE.to_string(),
            name: sub_name,
            sha,
        });
    }

    Object::sort_tree_entries(&mut entries);
    Object::Tree(entries).write(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::StatData;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::discover(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn write_tree_on_empty_index_produces_empty_tree() {
        let (_dir, repo) = init_repo();
        let sha = write_tree(&repo).unwrap();
        assert_eq!(hex::encode(sha), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn rerunning_write_tree_without_mutation_is_a_no_op() {
        let (_dir, repo) = init_repo();
        let store = repo.object_store();
        let mut index = Index::read_from(&repo.index_path()).unwrap();
        let blob_sha = store.write("blob", b"1234\n").unwrap();
        index.add_entry("test_file_1", blob_sha, 0o100644, StatData::default());
        index.write_to(&repo.index_path()).unwrap();

        let first = write_tree(&repo).unwrap();
        let second = write_tree(&repo).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn write_tree_builds_nested_directories() {
        let (_dir, repo) = init_repo();
        let store = repo.object_store();
        let mut index = Index::read_from(&repo.index_path()).unwrap();
        let sha1 = store.write("blob", b"1234\n").unwrap();
        let sha2 = store.write("blob", b"4321\n").unwrap();
        index.add_entry("test_file_1", sha1, 0o100644, StatData::default());
        index.add_entry("test_dir/test_file_2", sha2, 0o100644, StatData::default());
        index.write_to(&repo.index_path()).unwrap();

        let root = write_tree(&repo).unwrap();
        let object = Object::read(&store, &hex::encode(root)).unwrap();
        let Object::Tree(entries) = object else {
            panic!("expected tree");
        };
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.name == "test_file_1"));
        assert!(entries.iter().any(|e| e.name == "test_dir" && e.is_tree()));
    }
}
