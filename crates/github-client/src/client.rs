use std::time::Duration;

use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;

use crate::types::{Commit, Issue, Release, Tag, User};
use crate::{GitHubError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_MAX_PAGES: u32 = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ─── GitHubClient ─────────────────────────────────────────────────────────

/// Read-only GitHub REST client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    page_size: u32,
    max_pages: u32,
}

impl GitHubClient {
    /// Build a client against `api.github.com`. An empty token is treated as
    /// anonymous access.
    pub fn new(token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("watchcat/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.filter(|t| !t.is_empty()),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    /// Point the client at another API root (GitHub Enterprise, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Items requested per page when scanning the issues listing.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Upper bound on pages read by a single issues scan.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    // ─── Activity ─────────────────────────────────────────────────────────

    /// Latest published (non-draft, non-prerelease) release.
    pub async fn latest_release(&self, owner: &str, name: &str) -> Result<Release> {
        self.get(&format!("/repos/{owner}/{name}/releases/latest"), &[])
            .await
    }

    /// Head commit of the default branch.
    ///
    /// GitHub answers 409 Conflict for a repository with no commits at all;
    /// that is reported as [`GitHubError::NotFound`] like an empty listing.
    pub async fn latest_commit(&self, owner: &str, name: &str) -> Result<Commit> {
        let commits: Vec<Commit> = match self
            .get(
                &format!("/repos/{owner}/{name}/commits"),
                &[("per_page", "1".to_string())],
            )
            .await
        {
            Err(GitHubError::Status { status, .. }) if status == StatusCode::CONFLICT.as_u16() => {
                return Err(GitHubError::NotFound)
            }
            other => other?,
        };
        commits.into_iter().next().ok_or(GitHubError::NotFound)
    }

    /// Most recently created issue, skipping pull requests.
    pub async fn latest_issue(&self, owner: &str, name: &str) -> Result<Issue> {
        self.scan_issues(owner, name, |issue| !issue.is_pull_request())
            .await
    }

    /// Most recently created pull request.
    ///
    /// GitHub exposes pull requests through the generic issues listing, so
    /// this walks that listing page by page until an entry flagged as a pull
    /// request turns up.
    pub async fn latest_pull_request(&self, owner: &str, name: &str) -> Result<Issue> {
        self.scan_issues(owner, name, Issue::is_pull_request).await
    }

    /// First tag of the tags listing.
    pub async fn latest_tag(&self, owner: &str, name: &str) -> Result<Tag> {
        let tags: Vec<Tag> = self
            .get(
                &format!("/repos/{owner}/{name}/tags"),
                &[("per_page", "1".to_string())],
            )
            .await?;
        tags.into_iter().next().ok_or(GitHubError::NotFound)
    }

    /// User or organization profile.
    pub async fn user(&self, login: &str) -> Result<User> {
        self.get(&format!("/users/{login}"), &[]).await
    }

    // ─── Internal ─────────────────────────────────────────────────────────

    async fn scan_issues<F>(&self, owner: &str, name: &str, wanted: F) -> Result<Issue>
    where
        F: Fn(&Issue) -> bool,
    {
        let path = format!("/repos/{owner}/{name}/issues");
        for page in 1..=self.max_pages {
            let issues: Vec<Issue> = self
                .get(
                    &path,
                    &[
                        ("state", "all".to_string()),
                        ("sort", "created".to_string()),
                        ("direction", "desc".to_string()),
                        ("per_page", self.page_size.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let count = issues.len();
            if let Some(found) = issues.into_iter().find(|issue| wanted(issue)) {
                return Ok(found);
            }
            if count < self.page_size as usize {
                break;
            }
            tracing::debug!(owner, name, page, "no matching issue on page, continuing");
        }
        Err(GitHubError::NotFound)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .query(query);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GitHubError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| GitHubError::Decode { url, source })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
