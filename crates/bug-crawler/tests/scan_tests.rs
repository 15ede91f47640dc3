//! `bug-crawler scan` against a mocked GitHub API, both through the binary
//! and through the library with scripted answers.

use assert_cmd::Command;
use bug_crawler::cli::{CliError, ScanArgs};
use bug_crawler::commands::scan;
use bug_crawler::picker::parse_selection;
use bug_crawler::prompt::Prompter;
use bugcrawler_core::{CredentialStore, PlatformKind};
use predicates::prelude::*;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::collections::VecDeque;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pull(number: u64, created_at: &str, body: &str, labels: &[&str]) -> serde_json::Value {
    json!({
        "number": number,
        "title": format!("Change {number}"),
        "body": body,
        "user": {"login": "alice"},
        "state": "open",
        "created_at": created_at,
        "merged_at": null,
        "labels": labels.iter().map(|l| json!({"name": l})).collect::<Vec<_>>(),
        "html_url": format!("https://github.com/acme/app/pull/{number}"),
    })
}

async fn github(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "alice"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "app", "owner": {"login": "acme"}, "html_url": "https://github.com/acme/app"},
            {"name": "api", "owner": {"login": "acme"}, "html_url": "https://github.com/acme/api"},
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pull(12, "2024-01-20T10:00:00Z", "Fixes login\n\nbug_review: 2", &[]),
            pull(11, "2024-01-10T10:00:00Z", "", &["bug"]),
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/12/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "user": {"login": "bob"},
            "state": "APPROVED",
            "submitted_at": "2024-01-21T09:00:00Z",
            "body": "",
        }])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/pulls/11/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/issues/12/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/app/issues/11/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/missing/pulls"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(server)
        .await;
}

fn bug_crawler(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bug-crawler"));
    cmd.env("BUG_CRAWLER_CONFIG_DIR", config_dir)
        .env_remove("BUG_CRAWLER_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn pr_rules_scan_writes_json_and_csv() {
    let server = MockServer::start().await;
    github(&server).await;
    let config = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    let assert = bug_crawler(config.path())
        .env("GITHUB_TOKEN", "ghp_test")
        .env("BUG_CRAWLER_API_URL", server.uri())
        .args([
            "scan",
            "--platform",
            "github",
            "--mode",
            "pr-rules",
            "--repo",
            "acme/app",
            "--repo",
            "acme/missing",
            "--since",
            "2024-01-01",
            "--until",
            "2024-01-31",
            "--format",
            "json",
        ])
        .arg("--output-dir")
        .arg(output.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("✓ acme/app: 2 PR"))
        .stderr(predicate::str::contains("✗ acme/missing"));

    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["statistics"]["total_prs"], 2);
    assert_eq!(report["statistics"]["compliant_prs"], 1);
    assert_eq!(report["results"][0]["pr"]["number"], 12);
    assert_eq!(report["results"][1]["violations"][0], "description");

    let csv = std::fs::read_to_string(output.path().join("pr_rules_report.csv")).unwrap();
    assert!(csv.starts_with("PR#,Title,Author,Status,Compliant,Violations,URL"));
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn scan_without_terminal_needs_flags() {
    let config = tempfile::tempdir().unwrap();
    bug_crawler(config.path())
        .arg("scan")
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--platform"));
}

#[test]
fn unreachable_host_is_runtime_error() {
    let config = tempfile::tempdir().unwrap();
    bug_crawler(config.path())
        .env("GITHUB_TOKEN", "ghp_test")
        .env("BUG_CRAWLER_API_URL", "http://127.0.0.1:9")
        .args(["scan", "--platform", "github", "--repo", "acme/app"])
        .write_stdin("")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("GitHub request failed"));
}

#[test]
fn malformed_repository_is_usage_error() {
    let config = tempfile::tempdir().unwrap();
    bug_crawler(config.path())
        .env("GITHUB_TOKEN", "ghp_test")
        .args(["scan", "--platform", "github", "--repo", "no-slash"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid repository format"));
}

#[test]
fn scan_rejects_unknown_platform() {
    let config = tempfile::tempdir().unwrap();
    bug_crawler(config.path())
        .args(["scan", "--platform", "gitlab"])
        .assert()
        .code(2);
}

/// Answers prompts from a script.
struct Scripted(VecDeque<&'static str>);

impl Scripted {
    fn next(&mut self) -> &'static str {
        self.0.pop_front().unwrap()
    }
}

impl Prompter for Scripted {
    fn is_interactive(&self) -> bool {
        true
    }
    fn select(&mut self, _prompt: &str, _options: &[String]) -> Result<usize, CliError> {
        Ok(self.next().parse().unwrap())
    }
    fn multi_select(&mut self, _prompt: &str, options: &[String]) -> Result<Vec<usize>, CliError> {
        Ok(parse_selection(self.next(), options.len()).unwrap())
    }
    fn input(&mut self, _prompt: &str, _default: Option<&str>) -> Result<String, CliError> {
        Ok(self.next().to_string())
    }
    fn secret(&mut self, _prompt: &str) -> Result<SecretString, CliError> {
        Ok(SecretString::from(self.next().to_string()))
    }
    fn confirm(&mut self, _prompt: &str, _default: bool) -> Result<bool, CliError> {
        Ok(self.next() == "y")
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn interactive_bug_scan_saves_token_and_writes_report() {
    let server = MockServer::start().await;
    github(&server).await;
    let config = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(config.path());

    let args = ScanArgs {
        api_url: Some(server.uri()),
        output_dir: Some(output.path().to_path_buf()),
        ..ScanArgs::default()
    };
    let mut prompter = Scripted(VecDeque::from([
        "0",          // platform: GitHub
        "ghp_test",   // token
        "y",          // save credentials
        "0",          // mode: bug
        "0",          // source: my repositories
        "1",          // repositories: acme/app
        "2024-01-01", // start
        "2024-01-31", // end
        "1",          // bug type: bug_review
    ]));
    let mut out = Vec::new();
    let mut status = Vec::new();

    let summary = temp_env::async_with_vars([("GITHUB_TOKEN", None::<&str>)], async {
        scan::execute(&args, &store, &mut prompter, &mut out, &mut status).await
    })
    .await
    .unwrap();

    assert_eq!(summary.repositories, 1);
    assert_eq!(summary.total_prs, 2);
    assert_eq!(
        summary.report_file,
        Some(output.path().join("bug_report.csv"))
    );

    let saved = temp_env::with_var_unset("GITHUB_TOKEN", || store.token(PlatformKind::GitHub));
    assert_eq!(saved.unwrap().expose_secret(), "ghp_test");

    let table = String::from_utf8(out).unwrap();
    assert!(table.contains("BUG STATISTICS"));
    assert!(table.contains("2 bugs"));

    let csv = std::fs::read_to_string(output.path().join("bug_report.csv")).unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].starts_with("12,\"Change 12\",\"alice\",\"bug_review\",\"bug_review\",2,\"2024-01-20\","));
}
