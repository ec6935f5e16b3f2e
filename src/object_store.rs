//! Loose-object storage: read/write/exists by SHA-1, and short-prefix
//! resolution. Generalises the teacher's `object_read`/`object_write`
//! (which only ever produced a `BufRead` for the immediate caller) into a
//! standalone store that both the object model and `cat-file` share.

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::codec::{deflate, inflate, parse_decimal};
use crate::error::{Error, Result};
use crate::hash::{HashWriter, hash};

pub const MIN_PREFIX_LEN: usize = 4;

pub struct ObjectStore {
    objects_dir: PathBuf,
}

impl ObjectStore {
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        ObjectStore {
            objects_dir: objects_dir.into(),
        }
    }

    fn shard_dir(&self, hex: &str) -> PathBuf {
        self.objects_dir.join(&hex[..2])
    }

    fn object_path(&self, hex: &str) -> PathBuf {
        self.shard_dir(hex).join(&hex[2..])
    }

    pub fn exists(&self, hex: &str) -> bool {
        self.object_path(hex).is_file()
    }

    /// Read the loose object named by a *full* 40-hex id.
    pub fn read(&self, hex: &str) -> Result<(String, Vec<u8>)> {
        let path = self.object_path(hex);
        let raw = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        let inflated = inflate(&raw)?;

        let nul = inflated
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::corrupt(path_str(&path), "missing header terminator"))?;
        let header = std::str::from_utf8(&inflated[..nul])
            .map_err(|_| Error::corrupt(path_str(&path), "header is not valid UTF-8"))?;
        let (kind, size_str) = header
            .split_once(' ')
            .ok_or_else(|| Error::corrupt(path_str(&path), "header is in invalid format"))?;
        let declared_size = parse_decimal(size_str)
            .ok_or_else(|| Error::corrupt(path_str(&path), "object size isn't a number"))?;

        let payload = inflated[nul + 1..].to_vec();
        if payload.len() as u64 != declared_size {
            return Err(Error::corrupt(
                path_str(&path),
                format!(
                    "size mismatch: header says {declared_size}, payload is {}",
                    payload.len()
                ),
            ));
        }
        Ok((kind.to_string(), payload))
    }

    /// Write `kind`/`payload` as a loose object, short-circuiting if the
    /// resulting SHA already exists. Returns the 20-byte SHA.
    pub fn write(&self, kind: &str, payload: &[u8]) -> Result<[u8; 20]> {
        let sha = hash(kind, payload);
        let hex = hex::encode(sha);
        if self.exists(&hex) {
            return Ok(sha);
        }

        let shard = self.shard_dir(&hex);
        fs::create_dir_all(&shard).map_err(|e| Error::io(&shard, e))?;

        let header = format!("{kind} {}\0", payload.len());
        let mut hash_writer = HashWriter::new(Vec::new());
        hash_writer
            .write_all(header.as_bytes())
            .map_err(|e| Error::io(&shard, e))?;
        hash_writer
            .write_all(payload)
            .map_err(|e| Error::io(&shard, e))?;
        let identity = hash_writer.finalize();
        debug_assert_eq!(identity, sha);

        let compressed = deflate(&hash_writer.writer)?;
        let mut tmp = NamedTempFile::new_in(&shard).map_err(|e| Error::io(&shard, e))?;
        tmp.write_all(&compressed)
            .map_err(|e| Error::io(&shard, e))?;
        tmp.persist(self.object_path(&hex))
            .map_err(|e| Error::io(&shard, e.error))?;
        Ok(sha)
    }

    /// Resolve a (possibly abbreviated, >= [`MIN_PREFIX_LEN`] hex chars)
    /// object id to the full 40-hex id.
    pub fn resolve(&self, prefix: &str) -> Result<String> {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.len() < MIN_PREFIX_LEN || prefix.len() > 40 {
            return Err(Error::InvalidArgument(format!(
                "ambiguous argument '{prefix}': unknown revision or path not in the working tree"
            )));
        }
        if prefix.len() == 40 {
            return if self.exists(&prefix) {
                Ok(prefix)
            } else {
                Err(Error::ObjectNotFound(prefix))
            };
        }

        let shard = self.shard_dir(&prefix);
        let rest = &prefix[2..];
        let mut matches = Vec::new();
        if let Ok(entries) = fs::read_dir(&shard) {
            for entry in entries {
                let entry = entry.map_err(|e| Error::io(&shard, e))?;
                if !entry.file_type().map_err(|e| Error::io(&shard, e))?.is_file() {
                    continue;
                }
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with(rest) {
                    matches.push(format!("{}{}", &prefix[..2], name));
                }
            }
        }

        match matches.len() {
            0 => Err(Error::ObjectNotFound(prefix)),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::AmbiguousPrefix(prefix)),
        }
    }
}

fn path_str(path: &Path) -> Option<String> {
    Some(path.display().to_string())
}
