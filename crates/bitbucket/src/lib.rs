//! Bitbucket Cloud support for bug-crawler.
//!
//! Workspaces play the role of organizations. Pull requests carry no labels,
//! so only `bug_review` tags and `type: bug` descriptions apply.

mod client;
mod models;

pub use client::{BitbucketClient, DEFAULT_API_URL, TOKEN_URL};
