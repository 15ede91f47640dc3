//! Homebrew release descriptors for bug-crawler.
//!
//! This crate models the formulas that distribute prebuilt bug-crawler
//! binaries and keeps them well-formed.
//!
//! # Features
//!
//! - Line-oriented parsing of the formula dialect ([`parse_formula`])
//! - Lint rules for checksums, duplicate targets, templates and naming ([`lint`])
//! - Version monotonicity across revisions ([`check_history`])
//! - Formula generation from release assets ([`DescriptorBuilder`], [`FormulaGenerator`])
//!
//! # Example
//!
//! ```rust,ignore
//! use bugcrawler_homebrew::{DescriptorBuilder, FormulaGenerator, ReleaseTarget};
//!
//! let descriptor = DescriptorBuilder::new("bug-crawler", "1.0.6", "vfa-khuongdv/bug-crawler")
//!     .license("MIT")
//!     .checksum(ReleaseTarget::LinuxAmd64, sha)
//!     .build()?;
//! let ruby = FormulaGenerator::generate(&descriptor);
//! ```

pub mod builder;
pub mod checksum;
pub mod descriptor;
pub mod error;
pub mod formula;
pub mod history;
pub mod lint;
pub mod parser;

pub use builder::{DescriptorBuilder, ReleaseTarget};
pub use checksum::{sha256_file, sha256_hex};
pub use descriptor::{
    Arch, InstallStep, Os, PlatformTarget, ReleaseDescriptor, TargetEntry, TestKind, TestStep,
};
pub use error::{Error, Result};
pub use formula::FormulaGenerator;
pub use history::{HistoryCode, HistoryEntry, HistoryViolation, check_history};
pub use lint::{Finding, LintCode, LintReport, Severity, lint, lint_source};
pub use parser::{ParsedFormula, StructureIssue, parse_formula};
