//! Aggregate numbers over analyzer results.

use bugcrawler_analyzer::{BugResult, DetectionType, PrRuleResult, RuleViolation};
use serde::Serialize;

/// Bug statistics for one crawl.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    /// PRs fetched across all repositories
    pub total_prs: usize,
    /// PRs classified as bug-related
    pub bug_related_prs: usize,
    /// Detections from labels
    pub by_label: usize,
    /// Detections from `type: bug` in the description
    pub by_description_regex: usize,
    /// Detections from `bug_review: N` tags
    pub by_bug_review: usize,
    /// Sum of all `bug_review` counts
    pub total_bug_count: u64,
    /// `bug_related_prs * 100 / total_prs`, 0 when nothing was crawled
    pub bug_percentage: f64,
}

impl Statistics {
    /// Computes statistics over `results`. `total_prs` is the number of PRs
    /// crawled, which may exceed `results.len()` when results were filtered.
    #[must_use]
    pub fn from_results(results: &[BugResult], total_prs: usize) -> Self {
        let mut stats = Self {
            total_prs,
            ..Self::default()
        };

        for result in results.iter().filter(|r| r.is_bug_related) {
            stats.bug_related_prs += 1;
            match result.detection {
                Some(DetectionType::Label) => stats.by_label += 1,
                Some(DetectionType::DescriptionRegex) => stats.by_description_regex += 1,
                Some(DetectionType::BugReview) => {
                    stats.by_bug_review += 1;
                    stats.total_bug_count += u64::from(result.bug_count);
                }
                None => {}
            }
        }

        if total_prs > 0 {
            #[allow(clippy::cast_precision_loss)]
            let pct = stats.bug_related_prs as f64 * 100.0 / total_prs as f64;
            stats.bug_percentage = pct;
        }
        stats
    }
}

/// Compliance statistics for one crawl.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleStatistics {
    /// PRs checked
    pub total_prs: usize,
    /// PRs that follow every rule
    pub compliant_prs: usize,
    /// PRs that break at least one rule
    pub non_compliant_prs: usize,
    /// PRs with a blank description
    pub missing_description: usize,
    /// PRs without a peer review
    pub not_reviewed: usize,
    /// PRs without a peer approval
    pub not_approved: usize,
    /// Merged PRs that were approved only afterwards, or never
    pub merged_without_approval: usize,
    /// `compliant_prs * 100 / total_prs`, 0 when nothing was checked
    pub compliance_percentage: f64,
}

impl RuleStatistics {
    /// Computes compliance statistics over `results`.
    #[must_use]
    pub fn from_results(results: &[PrRuleResult]) -> Self {
        let mut stats = Self {
            total_prs: results.len(),
            ..Self::default()
        };

        for result in results {
            if result.is_compliant() {
                stats.compliant_prs += 1;
                continue;
            }
            stats.non_compliant_prs += 1;
            for violation in &result.violations {
                match violation {
                    RuleViolation::MissingDescription => stats.missing_description += 1,
                    RuleViolation::NotReviewed => stats.not_reviewed += 1,
                    RuleViolation::NotApproved => stats.not_approved += 1,
                    RuleViolation::MergedWithoutApproval => stats.merged_without_approval += 1,
                }
            }
        }

        if stats.total_prs > 0 {
            #[allow(clippy::cast_precision_loss)]
            let pct = stats.compliant_prs as f64 * 100.0 / stats.total_prs as f64;
            stats.compliance_percentage = pct;
        }
        stats
    }
}
