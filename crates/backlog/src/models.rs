//! Payloads returned by the Backlog API.

use bugcrawler_core::{Review, ReviewState};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub space_key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_key: String,
}

#[derive(Debug, Deserialize)]
pub struct GitRepository {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    pub id: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pull {
    pub number: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub created_user: User,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_user: User,
}

impl Comment {
    /// Converts a comment with text into a `commented` review. Status-change
    /// entries have no content.
    pub fn into_review(self) -> Option<Review> {
        let body = self.content.filter(|c| !c.trim().is_empty())?;
        Some(Review {
            reviewer: self.created_user.name,
            state: ReviewState::Commented,
            submitted_at: self.created,
            body,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEntry {
    pub message: String,
}
