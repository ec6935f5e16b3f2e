//! `cat-file`: inspect a single object by type (`-t`), pretty-print (`-p`),
//! or an explicit expected type.

use std::io::{Write, stdout};

use crate::error::{Error, Result};
use crate::object::Object;
use crate::object_store::ObjectStore;

pub enum Mode {
    Type,
    PrettyPrint,
    Expect(String),
}

pub fn cat_file(store: &ObjectStore, id: &str, mode: Mode) -> Result<()> {
    let object = Object::read(store, id)?;
    match mode {
        Mode::Type => {
            println!("{}", object.kind());
        }
        Mode::PrettyPrint => {
            let mut out = stdout().lock();
            object.pretty_print(&mut out)?;
            out.flush().map_err(|e| Error::io("<stdout>", e))?;
        }
        Mode::Expect(expected) => {
            if object.kind() != expected {
                return Err(Error::InvalidArgument(format!(
                    "object {id} is a {}, not a {expected}",
                    object.kind()
                )));
            }
            let mut out = stdout().lock();
            object.pretty_print(&mut out)?;
            out.flush().map_err(|e| Error::io("<stdout>", e))?;
        }
    }
    Ok(())
}
