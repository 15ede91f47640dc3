//! Backlog support for bug-crawler.
//!
//! Backlog projects play the role of organizations and repositories are
//! addressed as `PROJECT/repo`.

mod client;
mod models;

pub use client::{BacklogClient, DEFAULT_DOMAIN};
