//! Classifies pull requests as bug-related.

use bugcrawler_core::{Error, PullRequest, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

#[allow(clippy::expect_used)]
static BUG_REVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)bug_review:\s*(\d+)").expect("literal pattern"));

#[allow(clippy::expect_used)]
static BUG_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bug|fix|hotfix|critical|error|issue").expect("literal pattern")
});

#[allow(clippy::expect_used)]
static TYPE_BUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)type:\s*bug").expect("literal pattern"));

/// Which signal decides whether a PR is a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BugScanMode {
    /// Labels, falling back to `type: bug` in the description
    Label,
    /// `bug_review: N` tags in the description
    BugReview,
}

impl BugScanMode {
    /// Returns the identifier used on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::BugReview => "bug-review",
        }
    }

    /// Whether a detection belongs in a report for this mode.
    #[must_use]
    pub const fn reports(&self, detection: DetectionType) -> bool {
        match self {
            Self::BugReview => matches!(detection, DetectionType::BugReview),
            Self::Label => matches!(
                detection,
                DetectionType::Label | DetectionType::DescriptionRegex
            ),
        }
    }
}

impl fmt::Display for BugScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BugScanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "label" => Ok(Self::Label),
            "bug-review" | "bug_review" => Ok(Self::BugReview),
            _ => Err(Error::configuration_with_help(
                format!("Unknown bug type: {s}"),
                "Valid bug types: label, bug-review",
            )),
        }
    }
}

/// How a bug was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    /// `bug_review: N` in the description
    BugReview,
    /// A label matching the bug label pattern
    Label,
    /// `type: bug` in the description
    DescriptionRegex,
}

impl DetectionType {
    /// Returns the identifier used in reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BugReview => "bug_review",
            Self::Label => "label",
            Self::DescriptionRegex => "description_regex",
        }
    }
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BugResult {
    /// The analyzed pull request
    pub pr: PullRequest,
    /// Whether the PR counts as a bug
    pub is_bug_related: bool,
    /// How it was detected
    pub detection: Option<DetectionType>,
    /// Label text, `type: bug` or `bug_review`
    pub matched_keyword: Option<String>,
    /// Bugs declared with `bug_review: N`; 0 in label mode
    pub bug_count: u32,
}

impl BugResult {
    fn clean(pr: &PullRequest) -> Self {
        Self {
            pr: pr.clone(),
            is_bug_related: false,
            detection: None,
            matched_keyword: None,
            bug_count: 0,
        }
    }

    fn detected(mut self, detection: DetectionType, keyword: impl Into<String>, count: u32) -> Self {
        self.is_bug_related = true;
        self.detection = Some(detection);
        self.matched_keyword = Some(keyword.into());
        self.bug_count = count;
        self
    }
}

/// Bug detector for pull requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct BugAnalyzer;

impl BugAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classifies one pull request. The modes never mix signals.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn analyze(&self, pr: &PullRequest, mode: BugScanMode) -> BugResult {
        let result = BugResult::clean(pr);
        match mode {
            BugScanMode::BugReview => match bug_review_count(&pr.description) {
                Some(count) => result.detected(DetectionType::BugReview, "bug_review", count),
                None => result,
            },
            BugScanMode::Label => {
                if let Some(label) = pr.labels.iter().find(|l| BUG_LABEL_RE.is_match(l)) {
                    result.detected(DetectionType::Label, label.clone(), 0)
                } else if TYPE_BUG_RE.is_match(&pr.description) {
                    result.detected(DetectionType::DescriptionRegex, "type: bug", 0)
                } else {
                    result
                }
            }
        }
    }

    /// Classifies every pull request, preserving order.
    #[must_use]
    pub fn analyze_all(&self, prs: &[PullRequest], mode: BugScanMode) -> Vec<BugResult> {
        let results: Vec<BugResult> = prs.iter().map(|pr| self.analyze(pr, mode)).collect();
        debug!(
            mode = %mode,
            total = results.len(),
            bug_related = bug_related_count(&results),
            "Analyzed pull requests"
        );
        results
    }
}

/// Number of bug-related results.
#[must_use]
pub fn bug_related_count(results: &[BugResult]) -> usize {
    results.iter().filter(|r| r.is_bug_related).count()
}

/// Extracts a positive `bug_review: N` count.
fn bug_review_count(description: &str) -> Option<u32> {
    let caps = BUG_REVIEW_RE.captures(description)?;
    // Counts beyond u32 are saturated rather than dropped.
    let count = caps[1].parse::<u32>().unwrap_or(u32::MAX);
    (count > 0).then_some(count)
}
