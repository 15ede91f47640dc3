//! Platform abstraction for Git hosts.
//!
//! Every supported host (GitHub, Bitbucket Cloud, Backlog) implements the
//! [`Platform`] trait so the scan pipeline can stay host-agnostic.

use crate::date::DateRange;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Timeout applied to every HTTP request made by a platform client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Supported Git hosting platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// github.com
    GitHub,
    /// Bitbucket Cloud
    Bitbucket,
    /// Nulab Backlog
    Backlog,
}

impl PlatformKind {
    /// Returns the identifier used in config files and on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Bitbucket => "bitbucket",
            Self::Backlog => "backlog",
        }
    }

    /// Returns the user-friendly display name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::Bitbucket => "Bitbucket",
            Self::Backlog => "Backlog",
        }
    }

    /// Returns all supported platforms.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::GitHub, Self::Bitbucket, Self::Backlog]
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for PlatformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "bitbucket" => Ok(Self::Bitbucket),
            "backlog" => Ok(Self::Backlog),
            _ => Err(Error::configuration_with_help(
                format!("Unsupported platform: {s}"),
                "Valid platforms: github, bitbucket, backlog",
            )),
        }
    }
}

/// The account a token authenticated as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Login, username or space key
    pub login: String,
    /// Human readable name, when the host provides one
    pub display_name: Option<String>,
    /// Remaining API requests, when the host reports a rate limit
    pub rate_remaining: Option<u64>,
    /// Total API request budget, when the host reports a rate limit
    pub rate_limit: Option<u64>,
}

impl Identity {
    /// Creates an identity with only a login.
    #[must_use]
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            display_name: None,
            rate_remaining: None,
            rate_limit: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the rate limit information.
    #[must_use]
    pub const fn with_rate_limit(mut self, remaining: u64, limit: u64) -> Self {
        self.rate_remaining = Some(remaining);
        self.rate_limit = Some(limit);
        self
    }
}

/// A repository discovered on a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    /// `owner/name`
    pub full_name: String,
    /// Owner, workspace or project key
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Browser URL
    pub url: String,
}

impl Repository {
    /// Creates a repository record, deriving the full name.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        Self {
            full_name: format!("{owner}/{name}"),
            owner,
            name,
            url: url.into(),
        }
    }
}

/// A reference to a repository in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepoRef {
    /// Owner, workspace or project key
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoRef {
    /// Creates a new repository reference.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = Error;

    /// Splits on the first `/`; both halves must be non-empty.
    fn from_str(s: &str) -> Result<Self> {
        let spec = s.trim();
        match spec.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(Error::invalid_repository(s)),
        }
    }
}

/// Lifecycle status of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    /// Still open
    Open,
    /// Merged into the target branch
    Merged,
    /// Closed without merging
    Closed,
}

impl PrStatus {
    /// Returns the lowercase label used in reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a review or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Approved the changes
    Approved,
    /// Requested changes
    ChangesRequested,
    /// Plain comment
    Commented,
    /// A review that was later dismissed
    Dismissed,
    /// Started but not yet submitted
    Pending,
}

impl ReviewState {
    /// Maps a GitHub review state string (`APPROVED`, `CHANGES_REQUESTED`, ...).
    #[must_use]
    pub fn from_github(state: &str) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "APPROVED" => Self::Approved,
            "CHANGES_REQUESTED" => Self::ChangesRequested,
            "DISMISSED" => Self::Dismissed,
            "PENDING" => Self::Pending,
            _ => Self::Commented,
        }
    }
}

/// A review or conversation comment on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    /// Who wrote the review
    pub reviewer: String,
    /// Review state
    pub state: ReviewState,
    /// When it was submitted
    pub submitted_at: Option<DateTime<Utc>>,
    /// Review or comment body
    pub body: String,
}

/// A pull request with the fields the analyzers need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// PR number (id on Bitbucket)
    pub number: u64,
    /// Title (summary on Backlog)
    pub title: String,
    /// Body text
    pub description: String,
    /// Author login or display name
    pub author: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Merge time, when merged
    pub merged_at: Option<DateTime<Utc>>,
    /// Labels (always empty on Bitbucket and Backlog)
    pub labels: Vec<String>,
    /// Browser URL
    pub url: String,
    /// Lifecycle status
    pub status: PrStatus,
    /// Reviews, filled in only when requested
    pub reviews: Vec<Review>,
}

/// Outcome of fetching pull requests from one repository.
#[derive(Debug)]
pub struct RepoScan {
    /// The repository that was scanned
    pub repo: RepoRef,
    /// Pull requests or the error that stopped the fetch
    pub result: Result<Vec<PullRequest>>,
}

/// Interface all Git platforms implement.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Which platform this client talks to.
    fn kind(&self) -> PlatformKind;

    /// Verifies the credentials and returns the authenticated identity.
    async fn verify_token(&self) -> Result<Identity>;

    /// Repositories visible to the current user.
    async fn current_user_repositories(&self) -> Result<Vec<Repository>>;

    /// Repositories of an organization (workspace on Bitbucket, project on Backlog).
    async fn organization_repositories(&self, org: &str) -> Result<Vec<Repository>>;

    /// Organizations the current user belongs to.
    async fn current_user_organizations(&self) -> Result<Vec<String>>;

    /// Pull requests created inside `range`.
    async fn pull_requests(&self, repo: &RepoRef, range: &DateRange) -> Result<Vec<PullRequest>>;

    /// Reviews and conversation comments of one pull request.
    async fn pull_request_reviews(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>>;
}
