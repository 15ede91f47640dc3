//! Error types for report export.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while writing reports.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A report could not be written.
    #[error("Failed to write report {}: {source}", path.display())]
    #[diagnostic(
        code(bug_crawler::report::io),
        help("Check that the output directory exists and is writable")
    )]
    Io {
        /// The report file or directory
        path: PathBuf,
        /// The underlying source error
        #[source]
        source: std::io::Error,
    },

    /// A report could not be rendered to the terminal.
    #[error("Failed to render report: {0}")]
    #[diagnostic(code(bug_crawler::report::render))]
    Render(#[from] std::io::Error),

    /// A CSV record could not be written.
    #[error("Failed to write CSV: {0}")]
    #[diagnostic(code(bug_crawler::report::csv))]
    Csv(#[from] csv::Error),

    /// Results could not be serialized.
    #[error("Failed to serialize report: {0}")]
    #[diagnostic(code(bug_crawler::report::json))]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an I/O error for a report path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
