//! GitHub support for bug-crawler.
//!
//! [`GitHubClient`] talks to the GitHub REST API with a personal access
//! token and implements [`bugcrawler_core::Platform`].

mod client;
mod models;

pub use client::{DEFAULT_API_URL, GitHubClient};
