//! Error types for formula handling.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for formula operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, building or writing formulas.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The input is not a formula at all.
    #[error("Failed to parse formula: {message}")]
    #[diagnostic(
        code(bug_crawler::homebrew::parse),
        help("A formula starts with a line like `class BugCrawler < Formula`")
    )]
    Parse {
        /// The error message
        message: String,
    },

    /// A checksum could not be computed.
    #[error("Failed to compute checksum: {message}")]
    #[diagnostic(code(bug_crawler::homebrew::checksum))]
    Checksum {
        /// The error message
        message: String,
        /// The file being hashed
        path: Option<PathBuf>,
        /// The underlying source error
        #[source]
        source: Option<std::io::Error>,
    },

    /// An unknown release target was requested.
    #[error("Unknown target: {value}")]
    #[diagnostic(
        code(bug_crawler::homebrew::invalid_target),
        help("Valid targets: darwin-arm64, darwin-amd64, linux-arm64, linux-amd64")
    )]
    InvalidTarget {
        /// The offending target string
        value: String,
    },

    /// Descriptor input that cannot be turned into a formula.
    #[error("Invalid descriptor: {message}")]
    #[diagnostic(code(bug_crawler::homebrew::invalid_descriptor))]
    InvalidDescriptor {
        /// The error message
        message: String,
    },
}

impl Error {
    /// Create a new parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new checksum error for a file.
    #[must_use]
    pub fn checksum(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Checksum {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }

    /// Create a new invalid target error.
    #[must_use]
    pub fn invalid_target(value: impl Into<String>) -> Self {
        Self::InvalidTarget {
            value: value.into(),
        }
    }

    /// Create a new invalid descriptor error.
    #[must_use]
    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            message: message.into(),
        }
    }
}
