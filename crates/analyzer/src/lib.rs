//! Pull request analysis for bug-crawler.
//!
//! - [`BugAnalyzer`] decides whether a PR is bug-related, either from its
//!   labels or from `bug_review: N` tags in the description.
//! - [`PrRuleAnalyzer`] checks code review compliance.

pub mod bug;
pub mod rules;

pub use bug::{BugAnalyzer, BugResult, BugScanMode, DetectionType, bug_related_count};
pub use rules::{PrRuleAnalyzer, PrRuleResult, RuleViolation, compliant_count};
