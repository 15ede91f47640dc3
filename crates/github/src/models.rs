//! Payloads returned by the GitHub REST API.

use bugcrawler_core::{PrStatus, PullRequest, Repository, Review, ReviewState};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Repo {
    pub name: String,
    pub owner: Owner,
    pub html_url: String,
}

impl From<Repo> for Repository {
    fn from(repo: Repo) -> Self {
        Self::new(repo.owner.login, repo.name, repo.html_url)
    }
}

#[derive(Debug, Deserialize)]
pub struct Org {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Pull {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<Owner>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub html_url: String,
}

impl From<Pull> for PullRequest {
    fn from(pr: Pull) -> Self {
        let status = if pr.merged_at.is_some() {
            PrStatus::Merged
        } else if pr.state == "closed" {
            PrStatus::Closed
        } else {
            PrStatus::Open
        };
        Self {
            number: pr.number,
            title: pr.title,
            description: pr.body.unwrap_or_default(),
            author: pr.user.map(|u| u.login).unwrap_or_default(),
            created_at: pr.created_at,
            merged_at: pr.merged_at,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            url: pr.html_url,
            status,
            reviews: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PullReview {
    #[serde(default)]
    pub user: Option<Owner>,
    pub state: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: Option<String>,
}

impl From<PullReview> for Review {
    fn from(review: PullReview) -> Self {
        Self {
            reviewer: review.user.map(|u| u.login).unwrap_or_default(),
            state: ReviewState::from_github(&review.state),
            submitted_at: review.submitted_at,
            body: review.body.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub user: Option<Owner>,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IssueComment {
    /// Converts a non-empty comment into a `commented` review.
    pub fn into_review(self) -> Option<Review> {
        let body = self.body.filter(|b| !b.is_empty())?;
        Some(Review {
            reviewer: self.user.map(|u| u.login).unwrap_or_default(),
            state: ReviewState::Commented,
            submitted_at: Some(self.created_at),
            body,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimit,
}

#[derive(Debug, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
}

/// GitHub error body.
#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}
