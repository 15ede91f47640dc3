//! Tests for error types

use bugcrawler_core::{DateRange, Error, PlatformKind, RepoRef};
use miette::Diagnostic;

fn code_of(err: &Error) -> String {
    err.code().map(|c| c.to_string()).unwrap_or_default()
}

#[test]
fn test_configuration_error() {
    let error = Error::configuration("no platform selected");
    assert_eq!(error.to_string(), "Configuration error: no platform selected");
    assert!(error.help().is_none());

    let error = Error::configuration_with_help("missing space", "Pass --space");
    assert_eq!(error.help().map(|h| h.to_string()).as_deref(), Some("Pass --space"));
    assert_eq!(code_of(&error), "bug_crawler::core::config");
}

#[test]
fn test_api_error_names_platform_and_status() {
    let error = Error::api(PlatformKind::GitHub, 403, "rate limited");
    assert_eq!(error.to_string(), "GitHub API error: 403 - rate limited");
    assert_eq!(code_of(&error), "bug_crawler::core::api");
    assert!(!error.is_unauthorized());

    assert!(Error::api(PlatformKind::Backlog, 401, "bad key").is_unauthorized());
}

#[test]
fn test_http_error_has_static_help() {
    let error = Error::http(PlatformKind::Bitbucket, "connection refused");
    assert_eq!(
        error.to_string(),
        "Bitbucket request failed: connection refused"
    );
    assert!(error.help().is_some());
}

#[test]
fn test_repository_spec_errors() {
    for spec in ["no-slash", "/name", "owner/"] {
        let error = spec.parse::<RepoRef>().unwrap_err();
        assert_eq!(code_of(&error), "bug_crawler::core::invalid_repository", "{spec}");
        assert!(error.to_string().contains("Invalid repository format"));
    }
}

#[test]
fn test_date_range_errors() {
    let error = DateRange::parse("2024-02-01", "2024-01-01").unwrap_err();
    assert!(error.to_string().contains("is after end date"));
    assert_eq!(code_of(&error), "bug_crawler::core::invalid_date_range");

    let error = DateRange::parse("2024-13-01", "2024-12-31").unwrap_err();
    assert!(error.to_string().contains("'2024-13-01' is not a valid date"));
}

#[test]
fn test_io_error_keeps_path() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    match Error::io(io_err, "/tmp/config.json") {
        Error::Io { path, .. } => {
            assert_eq!(path.as_deref(), Some(std::path::Path::new("/tmp/config.json")));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
