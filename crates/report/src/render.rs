//! Terminal summaries and detail tables.

use crate::error::Result;
use crate::stats::{RuleStatistics, Statistics};
use bugcrawler_analyzer::{BugResult, DetectionType, PrRuleResult};
use std::io::Write;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const SEPARATOR_WIDTH: usize = 60;
const TITLE_WIDTH: usize = 40;

#[derive(Tabled)]
struct BugRow {
    #[tabled(rename = "PR#")]
    number: u64,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "AUTHOR")]
    author: String,
    #[tabled(rename = "DETECTION")]
    detection: String,
    #[tabled(rename = "BUGS/KEYWORD/LABEL")]
    detail: String,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "PR#")]
    number: u64,
    #[tabled(rename = "TITLE")]
    title: String,
    #[tabled(rename = "AUTHOR")]
    author: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "VIOLATIONS")]
    violations: String,
}

fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

/// Shortens a title to the details column width, counting characters.
#[must_use]
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_WIDTH {
        let head: String = title.chars().take(TITLE_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

/// The details column: `N bugs` for `bug_review`, the matched keyword otherwise.
#[must_use]
pub fn detail_column(result: &BugResult) -> String {
    match result.detection {
        Some(DetectionType::BugReview) => format!("{} bugs", result.bug_count),
        _ => result.matched_keyword.clone().unwrap_or_default(),
    }
}

/// Writes the bug statistics block.
pub fn write_summary<W: Write>(w: &mut W, stats: &Statistics) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "{}", separator())?;
    writeln!(w, "BUG STATISTICS")?;
    writeln!(w, "{}", separator())?;
    writeln!(w, "Total PRs crawled:   {}", stats.total_prs)?;
    writeln!(w, "Bug-related PRs:     {}", stats.bug_related_prs)?;

    let mut breakdown = Vec::new();
    if stats.by_bug_review > 0 {
        breakdown.push(format!(
            "via bug_review tag: {} (total bugs: {})",
            stats.by_bug_review, stats.total_bug_count
        ));
    }
    if stats.by_label > 0 {
        breakdown.push(format!("via label: {}", stats.by_label));
    }
    if stats.by_description_regex > 0 {
        breakdown.push(format!("via description: {}", stats.by_description_regex));
    }
    let last = breakdown.len().saturating_sub(1);
    for (i, line) in breakdown.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        writeln!(w, "  {branch} {line}")?;
    }

    writeln!(w, "Bug rate:            {:.2}%", stats.bug_percentage)?;
    writeln!(w, "{}", separator())?;
    Ok(())
}

/// Writes a table of the bug-related results.
pub fn write_details<W: Write>(w: &mut W, results: &[BugResult]) -> Result<()> {
    let rows: Vec<BugRow> = results
        .iter()
        .filter(|r| r.is_bug_related)
        .map(|r| BugRow {
            number: r.pr.number,
            title: truncate_title(&r.pr.title),
            author: r.pr.author.clone(),
            detection: r.detection.map(|d| d.as_str().to_string()).unwrap_or_default(),
            detail: detail_column(r),
        })
        .collect();

    writeln!(w)?;
    if rows.is_empty() {
        writeln!(w, "No bug-related PRs found.")?;
        return Ok(());
    }

    writeln!(w, "BUG-RELATED PRS")?;
    let table = Table::new(rows).with(Style::rounded()).to_string();
    writeln!(w, "{table}")?;
    Ok(())
}

/// Writes the review compliance block.
pub fn write_rule_summary<W: Write>(w: &mut W, stats: &RuleStatistics) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "{}", separator())?;
    writeln!(w, "PR RULE COMPLIANCE")?;
    writeln!(w, "{}", separator())?;
    writeln!(w, "Total PRs checked:   {}", stats.total_prs)?;
    writeln!(w, "Compliant PRs:       {}", stats.compliant_prs)?;
    writeln!(w, "Non-compliant PRs:   {}", stats.non_compliant_prs)?;
    writeln!(w, "  ├─ missing description: {}", stats.missing_description)?;
    writeln!(w, "  ├─ not reviewed: {}", stats.not_reviewed)?;
    writeln!(w, "  ├─ not approved: {}", stats.not_approved)?;
    writeln!(w, "  └─ merged before approval: {}", stats.merged_without_approval)?;
    writeln!(w, "Compliance rate:     {:.2}%", stats.compliance_percentage)?;
    writeln!(w, "{}", separator())?;
    Ok(())
}

/// Writes a table of the pull requests that break a rule.
pub fn write_rule_details<W: Write>(w: &mut W, results: &[PrRuleResult]) -> Result<()> {
    let rows: Vec<RuleRow> = results
        .iter()
        .filter(|r| !r.is_compliant())
        .map(|r| RuleRow {
            number: r.pr.number,
            title: truncate_title(&r.pr.title),
            author: r.pr.author.clone(),
            status: r.pr.status.to_string(),
            violations: violation_list(r),
        })
        .collect();

    writeln!(w)?;
    if rows.is_empty() {
        writeln!(w, "Every PR follows the review rules.")?;
        return Ok(());
    }

    writeln!(w, "NON-COMPLIANT PRS")?;
    let table = Table::new(rows).with(Style::rounded()).to_string();
    writeln!(w, "{table}")?;
    Ok(())
}

/// Violation messages joined with `; `.
#[must_use]
pub fn violation_list(result: &PrRuleResult) -> String {
    result
        .violations
        .iter()
        .map(|v| v.message())
        .collect::<Vec<_>>()
        .join("; ")
}
