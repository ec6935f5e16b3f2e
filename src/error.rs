use std::path::PathBuf;

use thiserror::Error;

/// The error kinds surfaced across the object store, index, cache-tree and
/// repository layers. `main` is the only place that turns one of these into
/// a `fatal:` line; every other routine just propagates with `?`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("pathspec '{0}' did not match any files")]
    PathNotFound(String),

    #[error("not a git repository (or any of the parent directories): .git")]
    NotARepository,

    #[error("corrupt object{}: {reason}", path.as_ref().map(|p| format!(" {p}")).unwrap_or_default())]
    CorruptObject {
        path: Option<String>,
        reason: String,
    },

    #[error("Not a valid object name {0}")]
    ObjectNotFound(String),

    #[error("short object ID {0} is ambiguous")]
    AmbiguousPrefix(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("failed to access {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to determine author/committer identity: {0}")]
    IdentityUnavailable(String),

    #[error("unsupported index extension '{0}'")]
    UnsupportedExtension(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoError {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: Option<String>, reason: impl Into<String>) -> Self {
        Error::CorruptObject {
            path,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
