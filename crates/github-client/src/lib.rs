//! `github-client`: the slice of the GitHub REST API that watchcat polls.
//!
//! Every "latest" lookup distinguishes a missing resource
//! ([`GitHubError::NotFound`]: 404, or an empty listing) from every other
//! failure, so callers can treat "nothing published yet" as a quiet no-op.
//!
//! ```rust,ignore
//! use github_client::GitHubClient;
//!
//! let client = GitHubClient::new(std::env::var("GITHUB_TOKEN").ok())?;
//! let release = client.latest_release("rust-lang", "rust").await?;
//! println!("{}", release.tag_name);
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{GitHubClient, DEFAULT_BASE_URL};
pub use error::GitHubError;
pub use types::{Commit, CommitDetail, Issue, PullRequestLinks, Release, Tag, TagCommit, User};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, GitHubError>;
