//! shed init: generate a lockfile in the current directory.
//!
//! Usually unnecessary since 'shed get' creates a lockfile automatically,
//! but useful to root a new lockfile in a subdirectory of a project whose
//! parent already has one.

use super::Globals;
use crate::client::LOCKFILE_NAME;
use crate::error::{ShedError, ShedResult};
use crate::lockfile::Lockfile;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

pub fn init(globals: &Globals) -> ShedResult<()> {
    const OP: &str = "cli::init";

    let path = globals
        .lockfile
        .clone()
        .unwrap_or_else(|| PathBuf::from(LOCKFILE_NAME));
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            println!("{} already exists", path.display());
            return Ok(());
        }
        Err(e) => {
            return Err(ShedError::io(
                OP,
                format!("failed to create lockfile {}", path.display()),
                e,
            ));
        }
    };
    Lockfile::new().write_to(&mut file)?;
    println!("Created {}", path.display());
    Ok(())
}
