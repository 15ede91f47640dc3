//! Code review compliance checks.

use bugcrawler_core::{PrStatus, PullRequest, Review, ReviewState};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// A broken review rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RuleViolation {
    /// Description is blank
    #[serde(rename = "description")]
    MissingDescription,
    /// Nobody but the author reviewed or commented
    #[serde(rename = "reviewed")]
    NotReviewed,
    /// Nobody but the author approved
    #[serde(rename = "approved")]
    NotApproved,
    /// Merged before any non-author approval
    #[serde(rename = "approved-before-merge")]
    MergedWithoutApproval,
}

impl RuleViolation {
    /// Returns the stable rule code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingDescription => "description",
            Self::NotReviewed => "reviewed",
            Self::NotApproved => "approved",
            Self::MergedWithoutApproval => "approved-before-merge",
        }
    }

    /// Returns the sentence shown in reports.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingDescription => "Missing description",
            Self::NotReviewed => "No review from another developer",
            Self::NotApproved => "No approval from another developer",
            Self::MergedWithoutApproval => "Merged before approval",
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Compliance of one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrRuleResult {
    /// The checked pull request
    pub pr: PullRequest,
    /// Rules it breaks, in rule order
    pub violations: Vec<RuleViolation>,
}

impl PrRuleResult {
    /// Whether the PR follows every rule.
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks pull requests against the review rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrRuleAnalyzer;

impl PrRuleAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks one pull request. Reviews must already be attached.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn check(&self, pr: &PullRequest) -> PrRuleResult {
        let mut violations = Vec::new();

        if pr.description.trim().is_empty() {
            violations.push(RuleViolation::MissingDescription);
        }

        if peer_reviews(pr).next().is_none() {
            violations.push(RuleViolation::NotReviewed);
        }

        if peer_approvals(pr).next().is_none() {
            violations.push(RuleViolation::NotApproved);
        }

        if pr.status == PrStatus::Merged {
            let approved_in_time = peer_approvals(pr).any(|r| match (r.submitted_at, pr.merged_at) {
                (Some(approved), Some(merged)) => approved <= merged,
                // Without timestamps the approval cannot be placed after the merge.
                _ => true,
            });
            if !approved_in_time {
                violations.push(RuleViolation::MergedWithoutApproval);
            }
        }

        PrRuleResult {
            pr: pr.clone(),
            violations,
        }
    }

    /// Checks every pull request, preserving order.
    #[must_use]
    pub fn analyze(&self, prs: &[PullRequest]) -> Vec<PrRuleResult> {
        let results: Vec<PrRuleResult> = prs.iter().map(|pr| self.check(pr)).collect();
        debug!(
            total = results.len(),
            compliant = compliant_count(&results),
            "Checked review rules"
        );
        results
    }
}

fn peer_reviews(pr: &PullRequest) -> impl Iterator<Item = &Review> {
    pr.reviews.iter().filter(move |r| r.reviewer != pr.author)
}

fn peer_approvals(pr: &PullRequest) -> impl Iterator<Item = &Review> {
    peer_reviews(pr).filter(|r| r.state == ReviewState::Approved)
}

/// Number of compliant results.
#[must_use]
pub fn compliant_count(results: &[PrRuleResult]) -> usize {
    results.iter().filter(|r| r.is_compliant()).count()
}
