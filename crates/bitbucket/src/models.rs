//! Payloads returned by the Bitbucket Cloud API.

use bugcrawler_core::{PrStatus, PullRequest, Repository, Review, ReviewState};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of a paginated collection.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub display_name: String,
}

impl Account {
    pub fn login(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.nickname.clone())
            .unwrap_or_else(|| self.display_name.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Href {
    #[serde(default)]
    pub href: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub html: Href,
}

#[derive(Debug, Deserialize)]
pub struct Workspace {
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct Repo {
    pub full_name: String,
    pub name: String,
    #[serde(default)]
    pub links: Links,
}

impl Repo {
    pub fn into_repository(self, workspace: &str) -> Repository {
        let (owner, name) = self
            .full_name
            .split_once('/')
            .map_or((workspace, self.name.as_str()), |(o, n)| (o, n));
        Repository {
            full_name: self.full_name.clone(),
            owner: owner.to_string(),
            name: name.to_string(),
            url: self.links.html.href,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pull {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: String,
    #[serde(default)]
    pub author: Option<Account>,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub closed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: Links,
}

impl From<Pull> for PullRequest {
    fn from(pr: Pull) -> Self {
        let status = match pr.state.as_str() {
            "MERGED" => PrStatus::Merged,
            "DECLINED" | "SUPERSEDED" => PrStatus::Closed,
            _ => PrStatus::Open,
        };
        Self {
            number: pr.id,
            title: pr.title,
            description: pr.description.unwrap_or_default(),
            author: pr.author.map(|a| a.display_name).unwrap_or_default(),
            created_at: pr.created_on,
            merged_at: if status == PrStatus::Merged {
                pr.closed_on
            } else {
                None
            },
            labels: Vec::new(),
            url: pr.links.html.href,
            status,
            reviews: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub raw: String,
}

#[derive(Debug, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub user: Account,
    pub created_on: DateTime<Utc>,
}

impl From<Comment> for Review {
    fn from(comment: Comment) -> Self {
        Self {
            reviewer: comment.user.display_name,
            state: ReviewState::Commented,
            submitted_at: Some(comment.created_on),
            body: comment.content.raw,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub user: Account,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub participated_on: Option<DateTime<Utc>>,
}

/// Pull request detail, used for approvals.
#[derive(Debug, Deserialize)]
pub struct PullDetail {
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl PullDetail {
    pub fn approvals(self) -> impl Iterator<Item = Review> {
        self.participants
            .into_iter()
            .filter(|p| p.approved)
            .map(|p| Review {
                reviewer: p.user.display_name,
                state: ReviewState::Approved,
                submitted_at: p.participated_on,
                body: String::new(),
            })
    }
}
