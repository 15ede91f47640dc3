//! Backlog client against a mocked API.

use bugcrawler_backlog::BacklogClient;
use bugcrawler_core::{DateRange, Error, Platform, PrStatus, RepoRef, ReviewState};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEB: &str = "https://acme.backlog.com";

fn client(server: &MockServer) -> BacklogClient {
    BacklogClient::with_urls(
        "acme",
        SecretString::from("key123".to_string()),
        format!("{}/api/v2", server.uri()),
        WEB,
    )
    .unwrap()
}

fn pull(number: u64, created: &str, status: u32) -> serde_json::Value {
    json!({
        "number": number,
        "summary": format!("Change {number}"),
        "description": "type: bug",
        "status": {"id": status, "name": "x"},
        "createdUser": {"name": "Hana"},
        "created": created,
        "merged": if status == 3 { json!("2024-05-10T00:00:00Z") } else { json!(null) },
    })
}

#[tokio::test]
async fn verify_token_reads_space() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/space"))
        .and(query_param("apiKey", "key123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spaceKey": "ACME",
            "name": "Acme Corp",
        })))
        .mount(&server)
        .await;

    let identity = client(&server).verify_token().await.unwrap();
    assert_eq!(identity.login, "ACME");
    assert_eq!(identity.display_name.as_deref(), Some("Acme Corp"));
}

#[tokio::test]
async fn unauthorized_uses_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/space"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{"message": "Authentication failure.", "code": 11}],
        })))
        .mount(&server)
        .await;

    let err = client(&server).verify_token().await.unwrap_err();
    assert!(err.is_unauthorized());
    let Error::Api { message, .. } = err else {
        panic!("expected API error");
    };
    assert_eq!(message, "Authentication failure.");
}

#[tokio::test]
async fn projects_act_as_organizations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "projectKey": "WEB", "name": "Web"},
            {"id": 2, "projectKey": "OPS", "name": "Ops"},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/projects/WEB/git/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 10, "name": "frontend"},
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/projects/OPS/git/repositories"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let backlog = client(&server);
    assert_eq!(
        backlog.current_user_organizations().await.unwrap(),
        ["WEB", "OPS"]
    );

    let repos = backlog.current_user_repositories().await.unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].full_name, "WEB/frontend");
    assert_eq!(repos[0].url, "https://acme.backlog.com/git/WEB/frontend");
}

#[tokio::test]
async fn pull_requests_page_by_offset() {
    let server = MockServer::start().await;
    let first: Vec<_> = (1..=100)
        .map(|n| pull(n, "2024-05-02T09:00:00Z", 1))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/v2/projects/WEB/git/repositories/frontend/pullRequests"))
        .and(query_param("count", "100"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(first)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/projects/WEB/git/repositories/frontend/pullRequests"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pull(101, "2024-05-03T09:00:00Z", 3),
            pull(102, "2024-04-03T09:00:00Z", 2),
            {
                "number": 103,
                "summary": "No date",
                "status": {"id": 1},
                "createdUser": {"name": "Hana"},
            },
        ])))
        .mount(&server)
        .await;

    let range = DateRange::parse("2024-05-01", "2024-05-31").unwrap();
    let prs = client(&server)
        .pull_requests(&RepoRef::new("WEB", "frontend"), &range)
        .await
        .unwrap();

    assert_eq!(prs.len(), 101);
    let merged = prs.iter().find(|p| p.number == 101).unwrap();
    assert_eq!(merged.status, PrStatus::Merged);
    assert!(merged.merged_at.is_some());
    assert_eq!(
        merged.url,
        "https://acme.backlog.com/git/WEB/frontend/pullRequests/101"
    );
    assert_eq!(merged.title, "Change 101");
    assert_eq!(merged.author, "Hana");
    assert!(prs.iter().all(|p| p.number != 102 && p.number != 103));
}

#[tokio::test]
async fn comments_without_content_are_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/api/v2/projects/WEB/git/repositories/frontend/pullRequests/5/comments",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"content": "LGTM", "created": "2024-05-03T10:00:00Z", "createdUser": {"name": "Ken"}},
            {"content": null, "created": "2024-05-03T11:00:00Z", "createdUser": {"name": "Ken"}},
        ])))
        .mount(&server)
        .await;

    let reviews = client(&server)
        .pull_request_reviews(&RepoRef::new("WEB", "frontend"), 5)
        .await
        .unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].reviewer, "Ken");
    assert_eq!(reviews[0].state, ReviewState::Commented);
}
