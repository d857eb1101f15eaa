//! Persistent last-seen state using redb.
//!
//! # Table design
//!
//! Two tables share one database file:
//!
//! ```text
//! markers : "owner/name/kind" -> last seen marker (UTF-8)
//! owners  : "owner"           -> JSON-encoded CachedAvatar
//! ```
//!
//! Every read and write is a single transaction touching a single key; no
//! operation spans keys, so concurrent checkers only ever contend on redb's
//! own writer lock.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::{store_err, Result, WatchcatError};
use crate::types::RepositoryTarget;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const MARKERS: TableDefinition<&str, &str> = TableDefinition::new("markers");
const OWNERS: TableDefinition<&str, &[u8]> = TableDefinition::new("owners");

// ---------------------------------------------------------------------------
// MarkerStore
// ---------------------------------------------------------------------------

/// Last-seen marker persistence, as consumed by the checkers.
pub trait MarkerStore: Send + Sync {
    /// The stored marker, or `None` if the target was never observed.
    fn get(&self, target: &RepositoryTarget) -> Result<Option<String>>;

    /// Write `value` as the marker for `target`, replacing any previous one.
    fn write(&self, target: &RepositoryTarget, value: &str) -> Result<()>;

    /// The stored marker, with "never observed" folded to `""`.
    fn read(&self, target: &RepositoryTarget) -> Result<String> {
        Ok(self.get(target)?.unwrap_or_default())
    }
}

/// Run a store operation on the blocking pool. redb commits fsync, so
/// store calls from async code go through here.
pub async fn blocking<T, F>(op: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| WatchcatError::Store(format!("task join error: {e}")))?
}

// ---------------------------------------------------------------------------
// CachedAvatar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAvatar {
    pub avatar_url: String,
    pub cached_at: DateTime<Utc>,
}

impl CachedAvatar {
    pub fn new(avatar_url: impl Into<String>, cached_at: DateTime<Utc>) -> Self {
        Self {
            avatar_url: avatar_url.into(),
            cached_at,
        }
    }

    /// An entry is stale once strictly more than `ttl` has elapsed.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at > ttl
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// On-disk store for markers and the owner avatar cache.
pub struct StateStore {
    db: Database,
}

impl StateStore {
    /// Open or create the database at `path`, creating parent directories
    /// and both tables if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(MARKERS).map_err(store_err)?;
        wt.open_table(OWNERS).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }

    /// All stored markers in key order. Keys that no longer parse (e.g. a
    /// target kind removed in a later version) are skipped.
    pub fn list_markers(&self) -> Result<Vec<(RepositoryTarget, String)>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(MARKERS).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            match RepositoryTarget::from_key(k.value()) {
                Some(target) => result.push((target, v.value().to_string())),
                None => tracing::debug!(key = k.value(), "skipping unrecognised marker key"),
            }
        }
        Ok(result)
    }

    pub fn read_avatar(&self, owner: &str) -> Result<Option<CachedAvatar>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(OWNERS).map_err(store_err)?;
        let Some(raw) = table.get(owner).map_err(store_err)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(raw.value())?))
    }

    pub fn write_avatar(&self, owner: &str, entry: &CachedAvatar) -> Result<()> {
        let value = serde_json::to_vec(entry)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(OWNERS).map_err(store_err)?;
            table
                .insert(owner, value.as_slice())
                .map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }
}

impl MarkerStore for StateStore {
    fn get(&self, target: &RepositoryTarget) -> Result<Option<String>> {
        let key = target.key();
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(MARKERS).map_err(store_err)?;
        let value = table.get(key.as_str()).map_err(store_err)?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn write(&self, target: &RepositoryTarget, value: &str) -> Result<()> {
        let key = target.key();
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(MARKERS).map_err(store_err)?;
            table.insert(key.as_str(), value).map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
