pub mod state;
pub mod watch;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use watchcat_core::{paths, StateStore};

fn db_path(db: Option<&Path>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(paths::default_db_path()?),
    }
}

pub(crate) fn open_store(db: Option<&Path>) -> Result<StateStore> {
    let path = db_path(db)?;
    StateStore::open(&path).with_context(|| format!("opening database {}", path.display()))
}
