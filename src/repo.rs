//! Repository discovery, `HEAD` handling, `init`, and identity resolution —
//! the boundary every command operates through. Generalises the teacher's
//! ad hoc `.git/HEAD` reads in `main.rs`/`commit.rs` into one `Repository`
//! value that is threaded through every operation.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::object_store::ObjectStore;

pub struct Repository {
    /// Absolute path to the `.git` directory.
    pub git_dir: PathBuf,
}

impl Repository {
    /// Walk upward from `start` looking for a `.git` directory.
    pub fn discover(start: &Path) -> Result<Repository> {
        let mut dir = start
            .canonicalize()
            .map_err(|e| Error::io(start, e))?;
        loop {
            let candidate = dir.join(".git");
            if candidate.is_dir() {
                return Ok(Repository { git_dir: candidate });
            }
            if !dir.pop() {
                return Err(Error::NotARepository);
            }
        }
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.git_dir.join("objects")
    }

    pub fn index_path(&self) -> PathBuf {
        crate::index::index_path(&self.git_dir)
    }

    pub fn object_store(&self) -> ObjectStore {
        ObjectStore::new(self.objects_dir())
    }

    pub fn head_path(&self) -> PathBuf {
        self.git_dir.join("HEAD")
    }

    /// Follow symbolic `HEAD` one level and return the SHA it names, or
    /// `None` if that ref has not been written yet.
    pub fn get_head_rev(&self) -> Result<Option<String>> {
        let head_path = self.head_path();
        let head = fs::read_to_string(&head_path).map_err(|e| Error::io(&head_path, e))?;
        let head = head.trim();
        let Some(ref_path) = head.strip_prefix("ref: ") else {
            // Detached HEAD: the file already holds a SHA directly.
            return Ok(Some(head.to_string()));
        };
        let ref_path = self.git_dir.join(ref_path.trim());
        if !ref_path.is_file() {
            return Ok(None);
        }
        let sha = fs::read_to_string(&ref_path).map_err(|e| Error::io(&ref_path, e))?;
        Ok(Some(sha.trim().to_string()))
    }

    /// Write `sha` to whatever ref symbolic `HEAD` points at, creating
    /// parent directories as needed.
    pub fn update_head_rev(&self, sha: &str) -> Result<()> {
        let head_path = self.head_path();
        let head = fs::read_to_string(&head_path).map_err(|e| Error::io(&head_path, e))?;
        let head = head.trim();
        let target = match head.strip_prefix("ref: ") {
            Some(ref_path) => self.git_dir.join(ref_path.trim()),
            None => head_path,
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&target, format!("{sha}\n")).map_err(|e| Error::io(&target, e))
    }

    /// Create (or reinitialise) the `.git` layout at `dir`, printing the
    /// same banner upstream Git does.
    pub fn init(dir: &Path) -> Result<()> {
        let git_dir = dir.join(".git");
        let reinit = git_dir.is_dir();

        for sub in ["objects", "refs/heads", "refs/tags", "branches"] {
            let path = git_dir.join(sub);
            fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        }

        let head_path = git_dir.join("HEAD");
        if !head_path.is_file() {
            fs::write(&head_path, "ref: refs/heads/master\n").map_err(|e| Error::io(&head_path, e))?;
        }

        let config_path = git_dir.join("config");
        if !config_path.is_file() {
            let config = "[core]\n\
                \trepositoryformatversion = 0\n\
                \tfilemode = false\n\
                \tbare = false\n\
                \tlogallrefupdates = true\n";
            fs::write(&config_path, config).map_err(|e| Error::io(&config_path, e))?;
        }

        let description_path = git_dir.join("description");
        if !description_path.is_file() {
            fs::write(
                &description_path,
                "Unnamed repository; edit this file 'description' to name the repository.\n",
            )
            .map_err(|e| Error::io(&description_path, e))?;
        }

        let abs = git_dir
            .canonicalize()
            .unwrap_or(git_dir)
            .display()
            .to_string();
        if reinit {
            println!("Reinitialized existing Git repository in {abs}/");
        } else {
            println!("Initialized empty Git repository in {abs}/");
        }
        Ok(())
    }
}

/// Resolves the `(name, email)` pair used to stamp author/committer lines.
/// Production order: `GIT_AUTHOR_*`/`GIT_COMMITTER_*` environment variables,
/// then the repository's own `.git/config`, then `~/.gitconfig`. Generalises
/// the teacher's `get_name_and_email_from_git_config`, which only ever read
/// the user-level file.
pub trait IdentityProvider {
    fn identity(&self) -> Result<(String, String)>;
}

pub struct EnvConfigIdentity<'a> {
    pub repo: &'a Repository,
}

impl IdentityProvider for EnvConfigIdentity<'_> {
    fn identity(&self) -> Result<(String, String)> {
        if let (Ok(name), Ok(email)) = (
            env::var("GIT_AUTHOR_NAME").or_else(|_| env::var("GIT_COMMITTER_NAME")),
            env::var("GIT_AUTHOR_EMAIL").or_else(|_| env::var("GIT_COMMITTER_EMAIL")),
        ) {
            return Ok((name, email));
        }

        if let Some(pair) = read_user_section(&self.repo.git_dir.join("config")) {
            return Ok(pair);
        }

        if let Some(home) = env::home_dir() {
            if let Some(pair) = read_user_section(&home.join(".gitconfig")) {
                return Ok(pair);
            }
        }

        Err(Error::IdentityUnavailable(
            "set GIT_AUTHOR_NAME/GIT_AUTHOR_EMAIL or add a [user] section to .git/config".into(),
        ))
    }
}

fn read_user_section(path: &Path) -> Option<(String, String)> {
    let contents = fs::read_to_string(path).ok()?;
    let mut name = None;
    let mut email = None;
    let mut in_user_section = false;
    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_user_section = line.eq_ignore_ascii_case("[user]");
            continue;
        }
        if !in_user_section {
            continue;
        }
        if let Some(value) = line.strip_prefix("name") {
            if let Some(value) = value.trim_start().strip_prefix('=') {
                name = Some(value.trim().to_string());
            }
        } else if let Some(value) = line.strip_prefix("email") {
            if let Some(value) = value.trim_start().strip_prefix('=') {
                email = Some(value.trim().to_string());
            }
        }
        if name.is_some() && email.is_some() {
            break;
        }
    }
    Some((name?, email?))
}

/// A fixed identity, for deterministic tests.
pub struct FixedIdentity(pub String, pub String);

impl IdentityProvider for FixedIdentity {
    fn identity(&self) -> Result<(String, String)> {
        Ok((self.0.clone(), self.1.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_then_discover_roundtrips() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::discover(dir.path()).unwrap();
        assert!(repo.git_dir.ends_with(".git"));
        assert_eq!(repo.get_head_rev().unwrap(), None);
    }

    #[test]
    fn discover_fails_outside_a_repository() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Repository::discover(dir.path()),
            Err(Error::NotARepository)
        ));
    }

    #[test]
    fn update_then_get_head_rev_roundtrips() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = Repository::discover(dir.path()).unwrap();
        let sha = "a".repeat(40);
        repo.update_head_rev(&sha).unwrap();
        assert_eq!(repo.get_head_rev().unwrap(), Some(sha));
    }
}
