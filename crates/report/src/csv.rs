//! CSV export.
//!
//! Text fields are always quoted and numbers stay bare, so titles such as
//! `Fix "login", again` survive spreadsheet imports untouched.

use crate::error::Result;
use crate::render::violation_list;
use bugcrawler_analyzer::{BugResult, DetectionType, PrRuleResult};
use csv::{QuoteStyle, Writer, WriterBuilder};
use std::io::Write;

/// Columns of the bug report.
pub const BUG_CSV_HEADER: [&str; 8] = [
    "PR#",
    "Title",
    "Author",
    "Detection Type",
    "Matched Keyword",
    "Number Bug",
    "Date Opened",
    "URL",
];

/// Columns of the PR rules report.
pub const RULES_CSV_HEADER: [&str; 7] = [
    "PR#",
    "Title",
    "Author",
    "Status",
    "Compliant",
    "Violations",
    "URL",
];

/// Bugs a row stands for: the `bug_review` count, or 1 for other detections.
#[must_use]
pub fn bug_number(result: &BugResult) -> u32 {
    match result.detection {
        Some(DetectionType::BugReview) => result.bug_count,
        _ => 1,
    }
}

/// Writes the header row with minimal quoting.
fn write_header<W: Write>(w: &mut W, columns: &[&str]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(w);
    writer.write_record(columns)?;
    writer.flush()?;
    Ok(())
}

fn row_writer<W: Write>(w: &mut W) -> Writer<&mut W> {
    WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(w)
}

/// Writes the bug report. Returns the number of data rows.
pub fn write_bug_csv<W: Write>(w: &mut W, results: &[BugResult]) -> Result<usize> {
    write_header(w, &BUG_CSV_HEADER)?;

    let mut writer = row_writer(w);
    let mut rows = 0;
    for result in results.iter().filter(|r| r.is_bug_related) {
        let pr = &result.pr;
        writer.write_record([
            pr.number.to_string(),
            pr.title.clone(),
            pr.author.clone(),
            result
                .detection
                .map(|d| d.as_str().to_string())
                .unwrap_or_default(),
            result.matched_keyword.clone().unwrap_or_default(),
            bug_number(result).to_string(),
            pr.created_at.format("%Y-%m-%d").to_string(),
            pr.url.clone(),
        ])?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// Writes the PR rules report. Every result gets a row.
pub fn write_rules_csv<W: Write>(w: &mut W, results: &[PrRuleResult]) -> Result<usize> {
    write_header(w, &RULES_CSV_HEADER)?;

    let mut writer = row_writer(w);
    for result in results {
        let pr = &result.pr;
        writer.write_record([
            pr.number.to_string(),
            pr.title.clone(),
            pr.author.clone(),
            pr.status.to_string(),
            if result.is_compliant() { "yes" } else { "no" }.to_string(),
            violation_list(result),
            pr.url.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(results.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bug, clean, rule_result};
    use bugcrawler_analyzer::RuleViolation;

    fn render_bug_csv(results: &[BugResult]) -> (usize, String) {
        let mut buf = Vec::new();
        let rows = write_bug_csv(&mut buf, results).unwrap();
        (rows, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_bug_csv_rows() {
        let results = vec![
            bug(1, DetectionType::Label, "bug", 0),
            clean(2),
            bug(3, DetectionType::BugReview, "bug_review", 3),
        ];
        let (rows, out) = render_bug_csv(&results);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(rows, 2);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], BUG_CSV_HEADER.join(","));
        assert_eq!(
            lines[1],
            "1,\"Change 1\",\"dev\",\"label\",\"bug\",1,\"2024-03-01\",\"https://github.com/acme/app/pull/1\""
        );
        assert!(lines[2].starts_with("3,\"Change 3\",\"dev\",\"bug_review\",\"bug_review\",3,"));
    }

    #[test]
    fn test_bug_csv_escapes_title() {
        let mut result = bug(9, DetectionType::Label, "fix", 0);
        result.pr.title = "Fix \"login\", again\nsecond line".to_string();
        let (_, out) = render_bug_csv(&[result]);
        assert!(out.contains("9,\"Fix \"\"login\"\", again\nsecond line\",\"dev\","));

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "Fix \"login\", again\nsecond line");
        assert_eq!(&record[5], "1");
    }

    #[test]
    fn test_bug_csv_header_only_without_bugs() {
        let (rows, out) = render_bug_csv(&[clean(1)]);
        assert_eq!(rows, 0);
        assert_eq!(out, format!("{}\n", BUG_CSV_HEADER.join(",")));
    }

    #[test]
    fn test_rules_csv() {
        let results = vec![
            rule_result(1, vec![]),
            rule_result(
                2,
                vec![RuleViolation::NotReviewed, RuleViolation::NotApproved],
            ),
        ];
        let mut buf = Vec::new();
        assert_eq!(write_rules_csv(&mut buf, &results).unwrap(), 2);
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], RULES_CSV_HEADER.join(","));
        assert!(lines[1].contains(",\"open\",\"yes\",\"\","));
        assert!(lines[2].contains(
            ",\"open\",\"no\",\"No review from another developer; No approval from another developer\","
        ));
    }
}
