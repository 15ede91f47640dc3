//! Lints and history checks over a recorded sequence of formula revisions.

use bugcrawler_homebrew::{
    HistoryCode, HistoryEntry, LintCode, TestKind, check_history, lint_source, parse_formula,
};
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

fn codes(name: &str) -> Vec<LintCode> {
    lint_source(&fixture(name))
        .unwrap()
        .findings()
        .iter()
        .map(|f| f.code)
        .collect()
}

#[test]
fn released_revisions_lint_clean() {
    for name in [
        "01-bug-crawler-1.0.0.rb",
        "02-bug-crawler-1.0.1.rb",
        "07-bug-crawler-1.0.6.rb",
    ] {
        let report = lint_source(&fixture(name)).unwrap();
        assert!(report.is_clean(), "{name}: {:?}", report.findings());
    }
}

#[test]
fn duplicate_linux_block_is_rejected() {
    let report = lint_source(&fixture("03-duplicate-linux.rb")).unwrap();
    let dup = report
        .findings()
        .iter()
        .find(|f| f.code == LintCode::DuplicateTarget)
        .unwrap();
    assert_eq!(dup.line, Some(20));
    assert!(dup.message.contains("line 15"));
    assert!(report.has_errors());
}

#[test]
fn trailing_brace_is_rejected() {
    let report = lint_source(&fixture("04-trailing-brace.rb")).unwrap();
    let malformed: Vec<_> = report
        .findings()
        .iter()
        .filter(|f| f.code == LintCode::MalformedStructure)
        .collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].line, Some(27));
}

#[test]
fn non_standard_checksum_lengths_are_rejected() {
    let report = lint_source(&fixture("05-short-checksums.rb")).unwrap();
    let messages: Vec<_> = report
        .findings()
        .iter()
        .filter(|f| f.code == LintCode::InvalidChecksum)
        .map(|f| f.message.as_str())
        .collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("62 characters"));
    assert!(messages[1].contains("66 characters"));
}

#[test]
fn template_placeholders_are_rejected() {
    let found = codes("06-template.rb");
    assert!(found.contains(&LintCode::UnresolvedTemplate));
    assert!(found.contains(&LintCode::InvalidVersion));
    assert!(found.contains(&LintCode::InvalidChecksum));
}

#[test]
fn version_flag_variant_is_recognized() {
    let parsed = parse_formula(&fixture("07-bug-crawler-1.0.6.rb")).unwrap();
    assert_eq!(parsed.descriptor.test.unwrap().kind, TestKind::VersionFlag);
}

#[test]
fn history_sequence_reports_placeholder_and_nothing_else() {
    let names = [
        "01-bug-crawler-1.0.0.rb",
        "02-bug-crawler-1.0.1.rb",
        "03-duplicate-linux.rb",
        "04-trailing-brace.rb",
        "05-short-checksums.rb",
        "06-template.rb",
        "07-bug-crawler-1.0.6.rb",
    ];
    let entries: Vec<HistoryEntry> = names
        .iter()
        .map(|name| HistoryEntry::new(*name, parse_formula(&fixture(name)).unwrap().descriptor))
        .collect();

    let violations = check_history(&entries);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].code, HistoryCode::UnparseableVersion);
    assert_eq!(violations[0].label, "06-template.rb");
    assert_eq!(violations[0].name, "bug-crawler");
}

#[test]
fn out_of_order_history_regresses() {
    let entries = vec![
        HistoryEntry::new(
            "new",
            parse_formula(&fixture("07-bug-crawler-1.0.6.rb")).unwrap().descriptor,
        ),
        HistoryEntry::new(
            "old",
            parse_formula(&fixture("02-bug-crawler-1.0.1.rb")).unwrap().descriptor,
        ),
    ];
    let violations = check_history(&entries);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].code, HistoryCode::VersionRegression);
}
