//! Checks across the historical sequence of formula revisions.

use crate::descriptor::ReleaseDescriptor;
use semver::Version;
use std::collections::HashMap;
use std::fmt;

/// Kind of history violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryCode {
    /// Version went down compared to the previous revision
    VersionRegression,
    /// Same version published with different downloads or checksums
    VersionReused,
    /// Version missing or not semver
    UnparseableVersion,
}

impl HistoryCode {
    /// Returns the kebab-case code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VersionRegression => "version-regression",
            Self::VersionReused => "version-reused",
            Self::UnparseableVersion => "unparseable-version",
        }
    }
}

impl fmt::Display for HistoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One revision in the sequence.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Where the revision came from (file path, commit, ...)
    pub label: String,
    /// The revision's descriptor
    pub descriptor: ReleaseDescriptor,
}

impl HistoryEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(label: impl Into<String>, descriptor: ReleaseDescriptor) -> Self {
        Self {
            label: label.into(),
            descriptor,
        }
    }
}

/// A violation of version monotonicity or immutability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryViolation {
    /// What went wrong
    pub code: HistoryCode,
    /// Package name
    pub name: String,
    /// Label of the offending revision
    pub label: String,
    /// Human readable description
    pub message: String,
}

struct Previous<'a> {
    version: Version,
    entry: &'a HistoryEntry,
}

/// Checks revisions given in historical order.
///
/// Entries are grouped by package name; each group must have
/// non-decreasing versions, and a repeated version must carry identical
/// downloads.
#[must_use]
pub fn check_history(entries: &[HistoryEntry]) -> Vec<HistoryViolation> {
    let mut previous: HashMap<&str, Previous<'_>> = HashMap::new();
    let mut violations = Vec::new();

    for entry in entries {
        let name = entry.descriptor.name.as_str();
        let raw = entry.descriptor.version.as_deref().unwrap_or("");
        let Ok(version) = Version::parse(raw.trim()) else {
            violations.push(HistoryViolation {
                code: HistoryCode::UnparseableVersion,
                name: name.to_string(),
                label: entry.label.clone(),
                message: if raw.is_empty() {
                    "no version declared".to_string()
                } else {
                    format!("version `{raw}` is not a semantic version")
                },
            });
            continue;
        };

        if let Some(prev) = previous.get(name) {
            if version < prev.version {
                violations.push(HistoryViolation {
                    code: HistoryCode::VersionRegression,
                    name: name.to_string(),
                    label: entry.label.clone(),
                    message: format!(
                        "version {version} is lower than {} in {}",
                        prev.version, prev.entry.label
                    ),
                });
            } else if version == prev.version
                && entry.descriptor.content_fingerprint()
                    != prev.entry.descriptor.content_fingerprint()
            {
                violations.push(HistoryViolation {
                    code: HistoryCode::VersionReused,
                    name: name.to_string(),
                    label: entry.label.clone(),
                    message: format!(
                        "version {version} was already published in {} with different downloads",
                        prev.entry.label
                    ),
                });
            }
        }

        previous.insert(name, Previous { version, entry });
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Arch, Os, PlatformTarget, TargetEntry};

    fn revision(label: &str, version: Option<&str>, sha: &str) -> HistoryEntry {
        let mut d = ReleaseDescriptor::new("BugCrawler");
        d.version = version.map(str::to_string);
        d.targets.push(TargetEntry {
            target: PlatformTarget::new(Os::Linux, Arch::Any),
            url: "https://example.com/bug-crawler-linux-amd64".to_string(),
            sha256: Some(sha.to_string()),
            line: 1,
        });
        HistoryEntry::new(label, d)
    }

    #[test]
    fn test_increasing_versions_pass() {
        let entries = vec![
            revision("r1", Some("1.0.0"), "a"),
            revision("r2", Some("1.0.1"), "b"),
            revision("r3", Some("1.0.6"), "c"),
        ];
        assert!(check_history(&entries).is_empty());
    }

    #[test]
    fn test_identical_republish_passes() {
        let entries = vec![
            revision("r1", Some("1.0.1"), "a"),
            revision("r2", Some("1.0.1"), "a"),
        ];
        assert!(check_history(&entries).is_empty());
    }

    #[test]
    fn test_regression_detected() {
        let entries = vec![
            revision("r1", Some("1.0.3"), "a"),
            revision("r2", Some("1.0.2"), "b"),
        ];
        let violations = check_history(&entries);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, HistoryCode::VersionRegression);
        assert_eq!(violations[0].label, "r2");
        assert!(violations[0].message.contains("r1"));
    }

    #[test]
    fn test_reused_version_detected() {
        let entries = vec![
            revision("r1", Some("1.0.4"), "a"),
            revision("r2", Some("1.0.4"), "b"),
        ];
        let violations = check_history(&entries);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, HistoryCode::VersionReused);
    }

    #[test]
    fn test_placeholder_version_is_unparseable() {
        let entries = vec![
            revision("r1", Some("1.0.0"), "a"),
            revision("r2", Some("{version}"), "b"),
            revision("r3", None, "c"),
            revision("r4", Some("1.0.1"), "d"),
        ];
        let violations = check_history(&entries);
        let codes: Vec<_> = violations.iter().map(|v| v.code).collect();
        assert_eq!(
            codes,
            vec![HistoryCode::UnparseableVersion, HistoryCode::UnparseableVersion]
        );
        assert!(violations[1].message.contains("no version"));
    }

    #[test]
    fn test_groups_by_name() {
        let mut other = revision("o1", Some("0.1.0"), "z");
        other.descriptor = {
            let mut d = other.descriptor.clone();
            d.class_name = "OtherTool".to_string();
            d.name = "other-tool".to_string();
            d
        };
        let entries = vec![revision("r1", Some("1.0.0"), "a"), other];
        assert!(check_history(&entries).is_empty());
    }
}
