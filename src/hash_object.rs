//! `hash-object`: compute a blob's SHA-1 identity (`"blob <size>\0<content>"`)
//! and optionally persist it, either from a file or from standard input.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::hash::hash;
use crate::object_store::ObjectStore;

/// Hash `payload` as a blob, writing it through `store` when `write` is set.
pub fn hash_object(store: &ObjectStore, payload: &[u8], write: bool) -> Result<[u8; 20]> {
    if write {
        store.write("blob", payload)
    } else {
        Ok(hash("blob", payload))
    }
}

pub fn hash_file(store: &ObjectStore, file: &Path, write: bool) -> Result<[u8; 20]> {
    let payload = fs::read(file).map_err(|e| Error::io(file, e))?;
    hash_object(store, &payload, write)
}

pub fn hash_stdin(store: &ObjectStore, write: bool) -> Result<[u8; 20]> {
    let mut payload = Vec::new();
    std::io::stdin()
        .read_to_end(&mut payload)
        .map_err(|e| Error::io("<stdin>", e))?;
    hash_object(store, &payload, write)
}
