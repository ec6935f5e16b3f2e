//! `ls-tree`: list a tree object's direct entries.

use std::io::{Write, stdout};

use crate::error::{Error, Result};
use crate::object::Object;
use crate::object_store::ObjectStore;

pub fn ls_tree(store: &ObjectStore, id: &str, name_only: bool) -> Result<()> {
    let object = Object::read(store, id)?;
    let Object::Tree(entries) = object else {
        return Err(Error::InvalidArgument(format!("{id} is not a tree object")));
    };

    let mut out = stdout().lock();
    for entry in &entries {
        let line = if name_only {
            format!("{}\n", entry.name)
        } else {
            format!(
                "{:0>6} {} {}\t{}\n",
                entry.mode,
                entry.kind(),
                hex::encode(entry.sha),
                entry.name
            )
        };
        out.write_all(line.as_bytes()).map_err(|e| Error::io("<stdout>", e))?;
    }
    Ok(())
}
