//! JSON export.

use crate::error::Result;
use crate::stats::{RuleStatistics, Statistics};
use bugcrawler_analyzer::{BugResult, PrRuleResult};
use serde::Serialize;
use std::io::Write;

/// Bug results with their statistics.
#[derive(Debug, Serialize)]
pub struct BugReport<'a> {
    /// Aggregate numbers
    pub statistics: Statistics,
    /// Bug-related results only
    pub results: Vec<&'a BugResult>,
}

impl<'a> BugReport<'a> {
    /// Builds the report, keeping only bug-related results.
    #[must_use]
    pub fn new(results: &'a [BugResult], total_prs: usize) -> Self {
        Self {
            statistics: Statistics::from_results(results, total_prs),
            results: results.iter().filter(|r| r.is_bug_related).collect(),
        }
    }
}

/// Review rule results with their statistics.
#[derive(Debug, Serialize)]
pub struct RuleReport<'a> {
    /// Aggregate numbers
    pub statistics: RuleStatistics,
    /// Every checked PR
    pub results: &'a [PrRuleResult],
}

impl<'a> RuleReport<'a> {
    /// Builds the report.
    #[must_use]
    pub fn new(results: &'a [PrRuleResult]) -> Self {
        Self {
            statistics: RuleStatistics::from_results(results),
            results,
        }
    }
}

/// Writes `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}
