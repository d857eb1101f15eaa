use thiserror::Error;

use crate::source::SourceError;
use crate::types::RepositoryTarget;

#[derive(Debug, Error)]
pub enum WatchcatError {
    #[error("store error: {0}")]
    Store(String),

    #[error("invalid config location '{0}': expected file://, http:// or https://")]
    InvalidLocation(String),

    #[error("could not read config from {url}: HTTP {status}")]
    ConfigHttp { url: String, status: u16 },

    #[error("invalid target kind: {0}")]
    InvalidTarget(String),

    #[error("dispatcher is stopped")]
    DispatcherStopped,

    #[error("check interval must be greater than zero")]
    ZeroInterval,

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, WatchcatError>;

/// Stringify any redb error into [`WatchcatError::Store`].
pub(crate) fn store_err<E: std::fmt::Display>(e: E) -> WatchcatError {
    WatchcatError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// CheckError
// ---------------------------------------------------------------------------

/// Why a checker run ended without a notification.
///
/// Everything except [`CheckError::NotFound`] is reported to the sinks.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("{target}: no {kind} published yet", kind = .target.kind)]
    NotFound { target: RepositoryTarget },

    #[error("{target}: failed to fetch latest {kind}: {source}", kind = .target.kind)]
    Fetch {
        target: RepositoryTarget,
        #[source]
        source: SourceError,
    },

    #[error("{target}: failed to read stored {kind}: {source}", kind = .target.kind)]
    Read {
        target: RepositoryTarget,
        #[source]
        source: WatchcatError,
    },

    #[error("{target}: failed to persist {kind} marker: {source}", kind = .target.kind)]
    Persist {
        target: RepositoryTarget,
        #[source]
        source: WatchcatError,
    },
}

impl CheckError {
    pub fn target(&self) -> &RepositoryTarget {
        match self {
            CheckError::NotFound { target }
            | CheckError::Fetch { target, .. }
            | CheckError::Read { target, .. }
            | CheckError::Persist { target, .. } => target,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CheckError::NotFound { .. })
    }
}
