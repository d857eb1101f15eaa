use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TargetKind
// ---------------------------------------------------------------------------

/// The category of repository activity being watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Release,
    Commit,
    Issue,
    #[serde(alias = "pr")]
    PullRequest,
    Tag,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Release => "release",
            TargetKind::Commit => "commit",
            TargetKind::Issue => "issue",
            TargetKind::PullRequest => "pull_request",
            TargetKind::Tag => "tag",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetKind {
    type Err = crate::error::WatchcatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(TargetKind::Release),
            "commit" => Ok(TargetKind::Commit),
            "issue" => Ok(TargetKind::Issue),
            "pull_request" | "pr" => Ok(TargetKind::PullRequest),
            "tag" => Ok(TargetKind::Tag),
            _ => Err(crate::error::WatchcatError::InvalidTarget(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RepositoryTarget
// ---------------------------------------------------------------------------

/// One watched feed: a single kind of activity on a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryTarget {
    pub owner: String,
    pub name: String,
    pub kind: TargetKind,
}

impl RepositoryTarget {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            kind,
        }
    }

    /// Store key: `owner/name/kind`.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.owner, self.name, self.kind)
    }

    /// Parse a key produced by [`RepositoryTarget::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        let mut parts = key.splitn(3, '/');
        let owner = parts.next()?;
        let name = parts.next()?;
        let kind = parts.next()?.parse().ok()?;
        Some(Self::new(owner, name, kind))
    }
}

impl fmt::Display for RepositoryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
