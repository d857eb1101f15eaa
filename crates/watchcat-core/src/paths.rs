use std::path::{Path, PathBuf};

use crate::error::{Result, WatchcatError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const CONFIG_DIR: &str = ".config/watchcat";
pub const DB_FILE: &str = "watchcat.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(WatchcatError::HomeNotFound)
}

/// `~/.config/watchcat/watchcat.db`
pub fn default_db_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(CONFIG_DIR).join(DB_FILE))
}

/// Expand a leading `~/` (or a bare `~`) against `home`.
pub fn expand_tilde_in(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// [`expand_tilde_in`] against the current user's home directory.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" || path.starts_with("~/") {
        Ok(expand_tilde_in(path, &home_dir()?))
    } else {
        Ok(PathBuf::from(path))
    }
}
