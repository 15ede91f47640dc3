//! Error types shared by the platform clients and the scan pipeline.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::platform::PlatformKind;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a Git host or managing local state.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(bug_crawler::core::config))]
    Configuration {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Credentials could not be found or were rejected.
    #[error("{platform} credentials error: {message}")]
    #[diagnostic(
        code(bug_crawler::core::credentials),
        help("Run `bug-crawler scan` interactively to enter and save credentials")
    )]
    Credentials {
        /// Platform the credentials belong to
        platform: PlatformKind,
        /// The error message
        message: String,
    },

    /// The remote API answered with a non-success status.
    #[error("{platform} API error: {status} - {message}")]
    #[diagnostic(code(bug_crawler::core::api))]
    Api {
        /// Platform that returned the error
        platform: PlatformKind,
        /// HTTP status code
        status: u16,
        /// Response body or summary
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{platform} request failed: {message}")]
    #[diagnostic(
        code(bug_crawler::core::http),
        help("Check your network connection and try again")
    )]
    Http {
        /// Platform the request was sent to
        platform: PlatformKind,
        /// The error message
        message: String,
    },

    /// A repository spec was not of the form `owner/name`.
    #[error("Invalid repository format: {spec}")]
    #[diagnostic(
        code(bug_crawler::core::invalid_repository),
        help("Repositories must be given as owner/name")
    )]
    InvalidRepository {
        /// The offending spec
        spec: String,
    },

    /// The requested date range is malformed.
    #[error("Invalid date range: {message}")]
    #[diagnostic(
        code(bug_crawler::core::invalid_date_range),
        help("Dates use the YYYY-MM-DD format and the start must not be after the end")
    )]
    InvalidDateRange {
        /// The error message
        message: String,
    },

    /// Wrapped I/O error.
    #[error("I/O error: {source}")]
    #[diagnostic(code(bug_crawler::core::io))]
    Io {
        /// The underlying source error
        #[source]
        source: std::io::Error,
        /// The path involved, when known
        path: Option<PathBuf>,
    },

    /// Wrapped JSON error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(bug_crawler::core::json))]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text.
    #[must_use]
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new credentials error.
    #[must_use]
    pub fn credentials(platform: PlatformKind, message: impl Into<String>) -> Self {
        Self::Credentials {
            platform,
            message: message.into(),
        }
    }

    /// Create a new API error.
    #[must_use]
    pub fn api(platform: PlatformKind, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            platform,
            status,
            message: message.into(),
            help: None,
        }
    }

    /// Create a new API error with help text.
    #[must_use]
    pub fn api_with_help(
        platform: PlatformKind,
        status: u16,
        message: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        Self::Api {
            platform,
            status,
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new HTTP transport error.
    #[must_use]
    pub fn http(platform: PlatformKind, message: impl Into<String>) -> Self {
        Self::Http {
            platform,
            message: message.into(),
        }
    }

    /// Create a new invalid repository error.
    #[must_use]
    pub fn invalid_repository(spec: impl Into<String>) -> Self {
        Self::InvalidRepository { spec: spec.into() }
    }

    /// Create a new invalid date range error.
    #[must_use]
    pub fn invalid_date_range(message: impl Into<String>) -> Self {
        Self::InvalidDateRange {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path that caused it.
    #[must_use]
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// Returns true when the error is an authentication failure (HTTP 401).
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }
}
