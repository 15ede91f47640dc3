//! Core library for bug-crawler
//!
//! This crate provides the pieces shared by every Git host client and by
//! the command line:
//! - The [`Platform`] trait and the pull request model
//! - Date ranges used to bound a crawl
//! - Credential storage in the user config directory
//! - The concurrent repository scan pipeline

pub mod credentials;
pub mod date;
pub mod error;
pub mod paths;
pub mod platform;
pub mod scan;

pub use credentials::CredentialStore;
pub use date::DateRange;
pub use error::{Error, Result};
pub use platform::{
    Identity, Platform, PlatformKind, PrStatus, PullRequest, REQUEST_TIMEOUT, RepoRef, RepoScan,
    Repository, Review, ReviewState,
};
