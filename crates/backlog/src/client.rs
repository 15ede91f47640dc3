//! Backlog implementation of the [`Platform`] trait.

use crate::models::{Comment, ErrorBody, GitRepository, Project, Pull, Space};
use async_trait::async_trait;
use bugcrawler_core::{
    DateRange, Error, Identity, Platform, PlatformKind, PrStatus, PullRequest, REQUEST_TIMEOUT,
    RepoRef, Repository, Result, Review,
};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Domain used when none is configured.
pub const DEFAULT_DOMAIN: &str = "backlog.com";

const PAGE_SIZE: usize = 100;
const MERGED_STATUS: u32 = 3;
const CLOSED_STATUS: u32 = 2;
const USER_AGENT: &str = concat!("bug-crawler/", env!("CARGO_PKG_VERSION"));
const PLATFORM: PlatformKind = PlatformKind::Backlog;

/// Client for the Backlog API v2, authenticated with an API key.
#[derive(Debug, Clone)]
pub struct BacklogClient {
    http: Client,
    api_url: String,
    web_url: String,
    api_key: SecretString,
}

impl BacklogClient {
    /// Creates a client for `https://{space}.{domain}/api/v2`. The domain
    /// defaults to `backlog.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if the space or key is empty, or the HTTP client
    /// cannot be built.
    pub fn new(space: &str, api_key: SecretString, domain: Option<&str>) -> Result<Self> {
        let space = space.trim();
        let domain = domain
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DOMAIN);
        let web_url = format!("https://{space}.{domain}");
        Self::with_urls(space, api_key, format!("{web_url}/api/v2"), web_url)
    }

    /// Creates a client with explicit API and browser roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the space or key is empty, or the HTTP client
    /// cannot be built.
    pub fn with_urls(
        space: &str,
        api_key: SecretString,
        api_url: impl Into<String>,
        web_url: impl Into<String>,
    ) -> Result<Self> {
        if space.trim().is_empty() || api_key.expose_secret().trim().is_empty() {
            return Err(Error::credentials(
                PLATFORM,
                "Space ID and API key are required",
            ));
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::http(PLATFORM, format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            web_url: web_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// API root the client talks to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        // The key travels as a query parameter, so only the path is logged.
        debug!(%path, "Backlog request");
        let response = self
            .http
            .get(format!("{}{path}", self.api_url))
            .query(&[("apiKey", self.api_key.expose_secret())])
            .query(params)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::http(PLATFORM, without_key(&e.to_string(), &self.api_key)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.errors.into_iter().next())
                .map_or(body, |e| e.message);
            return Err(if status == StatusCode::UNAUTHORIZED {
                Error::api_with_help(
                    PLATFORM,
                    status.as_u16(),
                    message,
                    "Check the space ID, domain and API key. Keys are issued under Personal Settings > API",
                )
            } else {
                Error::api(PLATFORM, status.as_u16(), message)
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::http(PLATFORM, format!("Invalid response from {path}: {e}")))
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        self.get_json("/projects", &[]).await
    }

    fn repository(&self, project: &str, name: String) -> Repository {
        let url = format!("{}/git/{project}/{name}", self.web_url);
        Repository::new(project, name, url)
    }
}

fn without_key(message: &str, key: &SecretString) -> String {
    message.replace(key.expose_secret(), "***")
}

fn status_of(pr: &Pull) -> PrStatus {
    match pr.status.id {
        MERGED_STATUS => PrStatus::Merged,
        CLOSED_STATUS => PrStatus::Closed,
        _ => PrStatus::Open,
    }
}

#[async_trait]
impl Platform for BacklogClient {
    fn kind(&self) -> PlatformKind {
        PLATFORM
    }

    async fn verify_token(&self) -> Result<Identity> {
        let space: Space = self.get_json("/space", &[]).await?;
        let mut identity = Identity::new(space.space_key);
        if !space.name.is_empty() {
            identity = identity.with_display_name(space.name);
        }
        Ok(identity)
    }

    async fn current_user_repositories(&self) -> Result<Vec<Repository>> {
        let mut repos = Vec::new();
        for project in self.projects().await? {
            match self.organization_repositories(&project.project_key).await {
                Ok(found) => repos.extend(found),
                Err(e) => warn!(project = %project.project_key, error = %e, "Skipping project"),
            }
        }
        Ok(repos)
    }

    async fn organization_repositories(&self, project: &str) -> Result<Vec<Repository>> {
        let repos: Vec<GitRepository> = self
            .get_json(&format!("/projects/{project}/git/repositories"), &[])
            .await?;
        Ok(repos
            .into_iter()
            .map(|r| self.repository(project, r.name))
            .collect())
    }

    async fn current_user_organizations(&self) -> Result<Vec<String>> {
        Ok(self
            .projects()
            .await?
            .into_iter()
            .map(|p| p.project_key)
            .collect())
    }

    async fn pull_requests(&self, repo: &RepoRef, range: &DateRange) -> Result<Vec<PullRequest>> {
        let path = format!(
            "/projects/{}/git/repositories/{}/pullRequests",
            repo.owner, repo.name
        );
        let mut pulls: Vec<Pull> = Vec::new();
        loop {
            let params = [
                ("count", PAGE_SIZE.to_string()),
                ("offset", pulls.len().to_string()),
            ];
            let page: Vec<Pull> = self.get_json(&path, &params).await?;
            let last = page.len() < PAGE_SIZE;
            pulls.extend(page);
            if last {
                break;
            }
        }

        let prs: Vec<PullRequest> = pulls
            .into_iter()
            .filter_map(|pr| {
                let created_at = pr.created.filter(|at| range.contains(*at))?;
                let status = status_of(&pr);
                Some(PullRequest {
                    url: format!(
                        "{}/git/{}/{}/pullRequests/{}",
                        self.web_url, repo.owner, repo.name, pr.number
                    ),
                    number: pr.number,
                    title: pr.summary,
                    description: pr.description.unwrap_or_default(),
                    author: pr.created_user.name,
                    created_at,
                    merged_at: pr.merged,
                    labels: Vec::new(),
                    status,
                    reviews: Vec::new(),
                })
            })
            .collect();
        debug!(repo = %repo, count = prs.len(), "Fetched Backlog pull requests");
        Ok(prs)
    }

    async fn pull_request_reviews(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>> {
        let path = format!(
            "/projects/{}/git/repositories/{}/pullRequests/{number}/comments",
            repo.owner, repo.name
        );
        let comments: Vec<Comment> = self
            .get_json(&path, &[("count", PAGE_SIZE.to_string())])
            .await?;
        Ok(comments.into_iter().filter_map(Comment::into_review).collect())
    }
}
