//! `log`: walk first-parent history from `HEAD`, printing each commit in
//! Git's short log format.

use std::io::{IsTerminal, Write, stdout};

use crate::error::{Error, Result};
use crate::object::Object;
use crate::repo::Repository;

pub fn log(repo: &Repository, no_color: bool) -> Result<()> {
    let store = repo.object_store();
    let color = !no_color && stdout().is_terminal();

    let Some(mut current) = repo.get_head_rev()? else {
        return Ok(());
    };

    let mut out = stdout().lock();
    loop {
        let object = Object::read(&store, &current)?;
        let Object::Commit(commit) = &object else {
            writeln!(
                out,
                "GFG: The next parent object might be a packfile. Packfiles are not supported."
            )
            .map_err(|e| Error::io("<stdout>", e))?;
            break;
        };
        object.print_log(&current, &mut out, color)?;
        writeln!(out).map_err(|e| Error::io("<stdout>", e))?;

        match commit.parents.first() {
            Some(parent) => current = parent.clone(),
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::add::add;
    use crate::commit::commit;
    use crate::repo::FixedIdentity;
    use tempfile::TempDir;

    #[test]
    fn log_on_empty_repo_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::discover(dir.path()).unwrap();
        assert!(log(&repo, true).is_ok());
    }

    #[test]
    fn log_walks_parent_chain() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::discover(dir.path()).unwrap();
        let identity = FixedIdentity("A".into(), "a@example.com".into());
        std::fs::write(dir.path().join("f"), b"1\n").unwrap();
        add(&repo, &[dir.path().join("f").to_string_lossy().to_string()]).unwrap();
        commit(&repo, &identity, "first".into()).unwrap();
        std::fs::write(dir.path().join("f"), b"2\n").unwrap();
        add(&repo, &[dir.path().join("f").to_string_lossy().to_string()]).unwrap();
        commit(&repo, &identity, "second".into()).unwrap();
        assert!(log(&repo, true).is_ok());
    }
}
