pub mod avatar;
pub mod checker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod notify;
pub mod paths;
pub mod source;
pub mod store;
pub mod types;
pub mod version;
pub mod watcher;

pub use checker::{Checker, Outcome};
pub use config::{Config, ConfigLoader, ConfigLocation, LocationLoader, RepoConfig};
pub use dispatcher::{Dispatcher, PoolConfig};
pub use error::{CheckError, Result, WatchcatError};
pub use notify::{ConsoleNotifier, FanOut, NotificationEvent, Notifier, SlackNotifier};
pub use source::{Activity, ActivitySource, Marker, SourceError};
pub use store::{MarkerStore, StateStore};
pub use types::{RepositoryTarget, TargetKind};
pub use watcher::{WatchState, Watcher, WatcherOptions};
