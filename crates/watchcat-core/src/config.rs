use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchcatError};
use crate::paths;
use crate::types::{RepositoryTarget, TargetKind};

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// The watch list.
///
/// ```yaml
/// repos:
///   - owner: rust-lang
///     name: rust
///     targets: [release, tag]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub repos: Vec<RepoConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub targets: Vec<TargetKind>,
}

impl RepoConfig {
    /// Configured kinds in order, duplicates removed.
    pub fn target_kinds(&self) -> Vec<TargetKind> {
        let mut kinds = Vec::with_capacity(self.targets.len());
        for kind in &self.targets {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Every (repository, kind) pair this snapshot asks to watch.
    pub fn targets(&self) -> Vec<RepositoryTarget> {
        self.repos
            .iter()
            .flat_map(|repo| {
                repo.target_kinds()
                    .into_iter()
                    .map(|kind| RepositoryTarget::new(&repo.owner, &repo.name, kind))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ConfigLocation
// ---------------------------------------------------------------------------

/// Where the watch list lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    File(PathBuf),
    Url(String),
}

impl FromStr for ConfigLocation {
    type Err = WatchcatError;

    /// Accepts `file://path`, `file://~/path`, `http(s)://...` and bare
    /// paths. Any other scheme is rejected.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(WatchcatError::InvalidLocation(s.to_string()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(ConfigLocation::Url(s.to_string()));
        }
        if let Some(path) = s.strip_prefix("file://") {
            if path.is_empty() {
                return Err(WatchcatError::InvalidLocation(s.to_string()));
            }
            return Ok(ConfigLocation::File(paths::expand_tilde(path)?));
        }
        if s.contains("://") {
            return Err(WatchcatError::InvalidLocation(s.to_string()));
        }
        Ok(ConfigLocation::File(paths::expand_tilde(s)?))
    }
}

impl std::fmt::Display for ConfigLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLocation::File(path) => write!(f, "file://{}", path.display()),
            ConfigLocation::Url(url) => f.write_str(url),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigLoader
// ---------------------------------------------------------------------------

/// Produces a fresh configuration snapshot. Called once per tick.
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    async fn load(&self) -> Result<Config>;
}

/// Loads from a [`ConfigLocation`].
pub struct LocationLoader {
    location: ConfigLocation,
    client: reqwest::Client,
}

impl LocationLoader {
    pub fn new(location: ConfigLocation) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { location, client })
    }

    pub fn location(&self) -> &ConfigLocation {
        &self.location
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(WatchcatError::ConfigHttp {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl ConfigLoader for LocationLoader {
    async fn load(&self) -> Result<Config> {
        let text = match &self.location {
            ConfigLocation::File(path) => tokio::fs::read_to_string(path).await?,
            ConfigLocation::Url(url) => self.fetch(url).await?,
        };
        let config = Config::from_yaml(&text)?;
        tracing::debug!(location = %self.location, repos = config.repos.len(), "config loaded");
        Ok(config)
    }
}
