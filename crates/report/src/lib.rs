//! Reporting for bug-crawler scans.
//!
//! Turns analyzer results into terminal summaries, detail tables and CSV or
//! JSON files.

pub mod csv;
pub mod error;
pub mod export;
pub mod json;
pub mod render;
pub mod stats;

pub use self::csv::{BUG_CSV_HEADER, RULES_CSV_HEADER, bug_number, write_bug_csv, write_rules_csv};
pub use error::{Error, Result};
pub use export::{BUG_REPORT_FILE, RULES_REPORT_FILE, export_bug_csv, export_json, export_rules_csv};
pub use json::{BugReport, RuleReport, write_json};
pub use render::{
    truncate_title, write_details, write_rule_details, write_rule_summary, write_summary,
};
pub use stats::{RuleStatistics, Statistics};

#[cfg(test)]
pub(crate) mod test_support {
    use bugcrawler_analyzer::{BugResult, DetectionType, PrRuleResult, RuleViolation};
    use bugcrawler_core::{PrStatus, PullRequest};
    use chrono::{TimeZone, Utc};

    pub fn pull_request(number: u64) -> PullRequest {
        PullRequest {
            number,
            title: format!("Change {number}"),
            description: String::new(),
            author: "dev".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            merged_at: None,
            labels: vec![],
            url: format!("https://github.com/acme/app/pull/{number}"),
            status: PrStatus::Open,
            reviews: vec![],
        }
    }

    pub fn bug(number: u64, detection: DetectionType, keyword: &str, count: u32) -> BugResult {
        BugResult {
            pr: pull_request(number),
            is_bug_related: true,
            detection: Some(detection),
            matched_keyword: Some(keyword.to_string()),
            bug_count: count,
        }
    }

    pub fn clean(number: u64) -> BugResult {
        BugResult {
            pr: pull_request(number),
            is_bug_related: false,
            detection: None,
            matched_keyword: None,
            bug_count: 0,
        }
    }

    pub fn rule_result(number: u64, violations: Vec<RuleViolation>) -> PrRuleResult {
        PrRuleResult {
            pr: pull_request(number),
            violations,
        }
    }
}
