//! The remote platform as seen by the checkers.
//!
//! [`ActivitySource`] is the seam between the engine and the GitHub API: the
//! engine asks for "the latest X of owner/name" and receives an [`Activity`]
//! whose [`Marker`] variant carries the comparison rule for that kind.

use std::cmp::Ordering;

use async_trait::async_trait;
use github_client::{GitHubClient, GitHubError};
use thiserror::Error;

use crate::types::TargetKind;
use crate::version::compare_versions;

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    /// Nothing of this kind exists yet (no releases, empty repository, ...).
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Api(GitHubError),

    #[error("{0}")]
    Other(String),
}

impl From<GitHubError> for SourceError {
    fn from(e: GitHubError) -> Self {
        match e {
            GitHubError::NotFound => SourceError::NotFound,
            other => SourceError::Api(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Marker
// ---------------------------------------------------------------------------

/// The last-seen value of one target, tagged with how it compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Release or tag name; ordered with [`compare_versions`].
    Version(String),
    /// Commit SHA; only equality is meaningful.
    Hash(String),
    /// Issue or pull request ID; grows monotonically.
    Id(i64),
}

impl Marker {
    /// The string persisted in the store.
    pub fn encode(&self) -> String {
        match self {
            Marker::Version(v) | Marker::Hash(v) => v.clone(),
            Marker::Id(id) => id.to_string(),
        }
    }

    /// True when this freshly fetched marker supersedes the `stored` one.
    ///
    /// `stored` is `""` for a target that has never been observed.
    pub fn supersedes(&self, stored: &str) -> bool {
        match self {
            Marker::Version(fetched) => {
                stored.is_empty() || compare_versions(stored, fetched) == Ordering::Less
            }
            Marker::Hash(fetched) => stored != fetched,
            Marker::Id(fetched) => match stored.parse::<i64>() {
                Ok(current) => current < *fetched,
                Err(_) => true,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// The latest item of one kind on one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub marker: Marker,
    pub link: String,
    pub title: String,
    pub body: String,
    pub author_avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// ActivitySource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Fetch the latest item of `kind`. Absence is [`SourceError::NotFound`].
    async fn latest(
        &self,
        kind: TargetKind,
        owner: &str,
        name: &str,
    ) -> Result<Activity, SourceError>;

    /// Avatar URL of a user or organization.
    async fn owner_avatar(&self, owner: &str) -> Result<String, SourceError>;
}

fn non_empty(s: String) -> Option<String> {
    Some(s).filter(|s| !s.is_empty())
}

#[async_trait]
impl ActivitySource for GitHubClient {
    async fn latest(
        &self,
        kind: TargetKind,
        owner: &str,
        name: &str,
    ) -> Result<Activity, SourceError> {
        let activity = match kind {
            TargetKind::Release => {
                let release = self.latest_release(owner, name).await?;
                Activity {
                    marker: Marker::Version(release.tag_name.clone()),
                    link: release.html_url,
                    title: release.tag_name,
                    body: release.body.unwrap_or_default(),
                    author_avatar: release.author.and_then(|u| non_empty(u.avatar_url)),
                }
            }
            TargetKind::Commit => {
                let commit = self.latest_commit(owner, name).await?;
                Activity {
                    marker: Marker::Hash(commit.sha.clone()),
                    link: commit.html_url,
                    title: commit.sha,
                    body: commit.commit.message,
                    author_avatar: commit.author.and_then(|u| non_empty(u.avatar_url)),
                }
            }
            TargetKind::Issue => {
                let issue = self.latest_issue(owner, name).await?;
                Activity {
                    marker: Marker::Id(issue.id),
                    link: issue.html_url,
                    title: issue.title,
                    body: issue.body.unwrap_or_default(),
                    author_avatar: issue.user.and_then(|u| non_empty(u.avatar_url)),
                }
            }
            TargetKind::PullRequest => {
                let pr = self.latest_pull_request(owner, name).await?;
                Activity {
                    marker: Marker::Id(pr.id),
                    link: pr.pull_request_html_url().to_string(),
                    title: pr.title,
                    body: pr.body.unwrap_or_default(),
                    author_avatar: pr.user.and_then(|u| non_empty(u.avatar_url)),
                }
            }
            TargetKind::Tag => {
                let tag = self.latest_tag(owner, name).await?;
                Activity {
                    marker: Marker::Version(tag.name.clone()),
                    link: format!("https://github.com/{owner}/{name}/tags"),
                    title: tag.name,
                    body: String::new(),
                    author_avatar: None,
                }
            }
        };
        Ok(activity)
    }

    async fn owner_avatar(&self, owner: &str) -> Result<String, SourceError> {
        Ok(self.user(owner).await?.avatar_url)
    }
}
