//! `bug-crawler formula` end to end against the recorded formula revisions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

const SHA: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("homebrew")
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bug_crawler() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bug-crawler"))
}

#[test]
fn lint_passes_released_formula() {
    bug_crawler()
        .args(["formula", "lint"])
        .arg(fixture("07-bug-crawler-1.0.6.rb"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 file(s) checked: 0 error(s), 0 warning(s)"));
}

#[test]
fn lint_reports_duplicate_target_with_location() {
    bug_crawler()
        .args(["formula", "lint"])
        .arg(fixture("01-bug-crawler-1.0.0.rb"))
        .arg(fixture("03-duplicate-linux.rb"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "03-duplicate-linux.rb:20: error[duplicate-target]",
        ))
        .stderr(predicate::str::contains("1 of 2 formula file(s) failed lint"));
}

#[test]
fn lint_rejects_template_placeholders() {
    bug_crawler()
        .args(["formula", "lint"])
        .arg(fixture("06-template.rb"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error[unresolved-template]"));
}

#[test]
fn history_flags_unparseable_version() {
    let names = [
        "01-bug-crawler-1.0.0.rb",
        "02-bug-crawler-1.0.1.rb",
        "06-template.rb",
        "07-bug-crawler-1.0.6.rb",
    ];
    bug_crawler()
        .args(["formula", "history"])
        .args(names.iter().map(|n| fixture(n)))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error[unparseable-version]"));
}

#[test]
fn history_accepts_ordered_releases() {
    bug_crawler()
        .args(["formula", "history"])
        .arg(fixture("01-bug-crawler-1.0.0.rb"))
        .arg(fixture("02-bug-crawler-1.0.1.rb"))
        .arg(fixture("07-bug-crawler-1.0.6.rb"))
        .assert()
        .success()
        .stdout(predicate::str::contains("3 revision(s) checked"));
}

#[test]
fn render_prints_formula() {
    bug_crawler()
        .args([
            "formula",
            "render",
            "--version",
            "1.1.0",
            "--repo",
            "acme/bug-crawler",
            "--desc",
            "Crawl pull requests",
            "--license",
            "MIT",
            "--version-test",
        ])
        .arg("--sha256")
        .arg(format!("linux-amd64={SHA}"))
        .arg("--sha256")
        .arg(format!("darwin-arm64={SHA}"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("class BugCrawler < Formula"))
        .stdout(predicate::str::contains("bug-crawler-linux-amd64"));
}

#[test]
fn render_hashes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("bug-crawler-linux-arm64");
    std::fs::write(&artifact, b"test").unwrap();
    let output = dir.path().join("bug-crawler.rb");

    bug_crawler()
        .args([
            "formula",
            "render",
            "--version",
            "1.1.0",
            "--repo",
            "acme/bug-crawler",
            "--desc",
            "Crawl pull requests",
            "--license",
            "MIT",
        ])
        .arg("--artifact")
        .arg(format!("linux-arm64={}", artifact.display()))
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains(SHA), "{written}");
}

#[test]
fn unknown_flag_is_usage_error() {
    bug_crawler()
        .args(["formula", "lint", "--no-such-flag", "x.rb"])
        .assert()
        .code(2);
}
