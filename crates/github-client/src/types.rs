//! Partial GitHub API response types.
//!
//! Only the fields watchcat reads are modelled; everything else in the
//! payload is ignored by serde.

use serde::Deserialize;

// ─── Users ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

// ─── Releases ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<User>,
}

// ─── Commits ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub html_url: String,
    pub commit: CommitDetail,
    /// `null` when the commit email is not linked to a GitHub account.
    #[serde(default)]
    pub author: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
}

// ─── Issues & pull requests ───────────────────────────────────────────────

/// An entry of the issues listing. GitHub returns pull requests in the same
/// listing; those carry a `pull_request` object.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub pull_request: Option<PullRequestLinks>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Browser URL of the pull request, falling back to the issue URL.
    pub fn pull_request_html_url(&self) -> &str {
        self.pull_request
            .as_ref()
            .and_then(|pr| pr.html_url.as_deref())
            .unwrap_or(&self.html_url)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestLinks {
    #[serde(default)]
    pub html_url: Option<String>,
}

// ─── Tags ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
    pub commit: TagCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagCommit {
    pub sha: String,
}
