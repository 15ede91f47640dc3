//! Bitbucket client against a mocked API.

use bugcrawler_bitbucket::BitbucketClient;
use bugcrawler_core::{DateRange, Error, Platform, PrStatus, RepoRef, ReviewState};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> BitbucketClient {
    BitbucketClient::with_base_url(
        "dev@example.com",
        SecretString::from("atl-token".to_string()),
        server.uri(),
    )
    .unwrap()
}

#[tokio::test]
async fn verify_token_uses_basic_auth() {
    let server = MockServer::start().await;
    // base64("dev@example.com:atl-token")
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header(
            "authorization",
            "Basic ZGV2QGV4YW1wbGUuY29tOmF0bC10b2tlbg==",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "username": "dev",
            "display_name": "Dev Eloper",
        })))
        .mount(&server)
        .await;

    let identity = client(&server).verify_token().await.unwrap();
    assert_eq!(identity.login, "dev");
    assert_eq!(identity.display_name.as_deref(), Some("Dev Eloper"));
    assert_eq!(identity.rate_limit, None);
}

#[tokio::test]
async fn unauthorized_explains_scopes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).verify_token().await.unwrap_err();
    assert!(err.is_unauthorized());
    let Error::Api { help, .. } = err else {
        panic!("expected API error");
    };
    let help = help.unwrap();
    assert!(help.contains("Pull Request (Read)"));
    assert!(help.contains("id.atlassian.com"));
}

#[tokio::test]
async fn workspaces_and_repositories_follow_next() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/workspaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"slug": "team"}, {"slug": "broken"}],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/team"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{
                "full_name": "team/web",
                "name": "web",
                "links": {"html": {"href": "https://bitbucket.org/team/web"}},
            }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/team"))
        .and(query_param("pagelen", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{
                "full_name": "team/api",
                "name": "api",
                "links": {"html": {"href": "https://bitbucket.org/team/api"}},
            }],
            "next": format!("{}/repositories/team?page=2", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/broken"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let repos = client(&server).current_user_repositories().await.unwrap();
    let names: Vec<_> = repos.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(names, ["team/api", "team/web"]);
    assert_eq!(repos[0].owner, "team");
    assert_eq!(repos[1].url, "https://bitbucket.org/team/web");
}

#[tokio::test]
async fn pull_requests_map_state_and_merge_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repositories/team/api/pullrequests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [
                {
                    "id": 12,
                    "title": "Fix login",
                    "description": "bug_review: 2",
                    "state": "MERGED",
                    "author": {"display_name": "Alice"},
                    "created_on": "2024-03-05T10:00:00+00:00",
                    "closed_on": "2024-03-06T10:00:00+00:00",
                    "links": {"html": {"href": "https://bitbucket.org/team/api/pull-requests/12"}},
                },
                {
                    "id": 13,
                    "title": "WIP",
                    "state": "OPEN",
                    "author": {"display_name": "Bob"},
                    "created_on": "2024-03-07T10:00:00+00:00",
                    "closed_on": null,
                    "links": {"html": {"href": "https://bitbucket.org/team/api/pull-requests/13"}},
                },
                {
                    "id": 9,
                    "title": "Old",
                    "state": "MERGED",
                    "author": {"display_name": "Alice"},
                    "created_on": "2024-01-05T10:00:00+00:00",
                    "links": {"html": {"href": "https://bitbucket.org/team/api/pull-requests/9"}},
                },
            ],
        })))
        .mount(&server)
        .await;

    let range = DateRange::parse("2024-03-01", "2024-03-31").unwrap();
    let prs = client(&server)
        .pull_requests(&RepoRef::new("team", "api"), &range)
        .await
        .unwrap();

    assert_eq!(prs.len(), 2);
    assert_eq!(prs[0].number, 12);
    assert_eq!(prs[0].status, PrStatus::Merged);
    assert!(prs[0].merged_at.is_some());
    assert_eq!(prs[0].author, "Alice");
    assert!(prs[0].labels.is_empty());
    assert_eq!(prs[1].status, PrStatus::Open);
    assert_eq!(prs[1].merged_at, None);
    assert_eq!(prs[1].description, "");
}

#[tokio::test]
async fn reviews_combine_comments_and_approvals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repositories/team/api/pullrequests/12/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{
                "content": {"raw": "Please add a test"},
                "user": {"display_name": "Carol"},
                "created_on": "2024-03-05T12:00:00+00:00",
            }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/team/api/pullrequests/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "participants": [
                {"user": {"display_name": "Carol"}, "approved": true, "participated_on": "2024-03-05T13:00:00+00:00"},
                {"user": {"display_name": "Dan"}, "approved": false},
            ],
        })))
        .mount(&server)
        .await;

    let reviews = client(&server)
        .pull_request_reviews(&RepoRef::new("team", "api"), 12)
        .await
        .unwrap();

    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].state, ReviewState::Commented);
    assert_eq!(reviews[0].body, "Please add a test");
    assert_eq!(reviews[1].reviewer, "Carol");
    assert_eq!(reviews[1].state, ReviewState::Approved);
}
