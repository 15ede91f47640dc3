//! GitHub implementation of the [`Platform`] trait.

use crate::models::{
    ApiMessage, IssueComment, Org, Pull, PullReview, RateLimitResponse, Repo, User,
};
use async_trait::async_trait;
use bugcrawler_core::{
    DateRange, Error, Identity, Platform, PlatformKind, PullRequest, REQUEST_TIMEOUT, RepoRef,
    Repository, Result, Review,
};
use reqwest::header::{ACCEPT, HeaderMap, LINK};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const PER_PAGE: u32 = 100;
const USER_AGENT: &str = concat!("bug-crawler/", env!("CARGO_PKG_VERSION"));
const PLATFORM: PlatformKind = PlatformKind::GitHub;

/// Client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: SecretString,
}

impl GitHubClient {
    /// Creates a client for api.github.com.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: SecretString) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    /// Creates a client for another API root (GitHub Enterprise, tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(token: SecretString, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::http(PLATFORM, format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        debug!(%url, "GitHub request");
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| Error::http(PLATFORM, e.to_string()))?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url).await?;
        response
            .json()
            .await
            .map_err(|e| Error::http(PLATFORM, format!("Invalid response from {url}: {e}")))
    }

    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<(Vec<T>, Option<String>)> {
        let response = self.get(url).await?;
        let next = next_link(response.headers());
        let items = response
            .json()
            .await
            .map_err(|e| Error::http(PLATFORM, format!("Invalid response from {url}: {e}")))?;
        Ok((items, next))
    }

    /// Fetches every page starting at `url`.
    async fn get_all<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let (page, following) = self.get_page(&url).await?;
            items.extend(page);
            next = following;
        }
        Ok(items)
    }

    async fn issue_comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>> {
        let url = self.url(&format!(
            "/repos/{}/{}/issues/{number}/comments?per_page={PER_PAGE}&page=1",
            repo.owner, repo.name
        ));
        let comments: Vec<IssueComment> = self.get_all(url).await?;
        Ok(comments.into_iter().filter_map(IssueComment::into_review).collect())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);

    Err(match status {
        StatusCode::UNAUTHORIZED => Error::api_with_help(
            PLATFORM,
            status.as_u16(),
            message,
            "The token is invalid or expired. Create a new one at https://github.com/settings/tokens",
        ),
        StatusCode::FORBIDDEN => Error::api_with_help(
            PLATFORM,
            status.as_u16(),
            message,
            "The token lacks access or the rate limit is exhausted. Classic tokens need the repo and read:org scopes",
        ),
        _ => Error::api(PLATFORM, status.as_u16(), message),
    })
}

/// Extracts the `rel="next"` target from a `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(LINK)?.to_str().ok()?;
    value.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|p| p.trim() == "rel=\"next\"")
            .then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}

#[async_trait]
impl Platform for GitHubClient {
    fn kind(&self) -> PlatformKind {
        PLATFORM
    }

    async fn verify_token(&self) -> Result<Identity> {
        let user: User = self.get_json(&self.url("/user")).await?;
        let mut identity = Identity::new(user.login);
        if let Some(name) = user.name.filter(|n| !n.is_empty()) {
            identity = identity.with_display_name(name);
        }

        match self
            .get_json::<RateLimitResponse>(&self.url("/rate_limit"))
            .await
        {
            Ok(rate) => {
                identity =
                    identity.with_rate_limit(rate.resources.core.remaining, rate.resources.core.limit);
            }
            Err(e) => debug!(error = %e, "Rate limit unavailable"),
        }
        Ok(identity)
    }

    async fn current_user_repositories(&self) -> Result<Vec<Repository>> {
        let repos: Vec<Repo> = self
            .get_all(self.url(&format!("/user/repos?per_page={PER_PAGE}&page=1")))
            .await?;
        Ok(repos.into_iter().map(Repository::from).collect())
    }

    async fn organization_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        let repos: Vec<Repo> = self
            .get_all(self.url(&format!(
                "/orgs/{org}/repos?type=all&per_page={PER_PAGE}&page=1"
            )))
            .await?;
        Ok(repos.into_iter().map(Repository::from).collect())
    }

    async fn current_user_organizations(&self) -> Result<Vec<String>> {
        let orgs: Vec<Org> = self
            .get_all(self.url(&format!("/user/orgs?per_page={PER_PAGE}&page=1")))
            .await?;
        Ok(orgs.into_iter().map(|o| o.login).collect())
    }

    async fn pull_requests(&self, repo: &RepoRef, range: &DateRange) -> Result<Vec<PullRequest>> {
        let start = range.start_instant();
        let mut prs = Vec::new();
        let mut next = Some(self.url(&format!(
            "/repos/{}/{}/pulls?state=all&sort=created&direction=desc&per_page={PER_PAGE}&page=1",
            repo.owner, repo.name
        )));

        while let Some(url) = next {
            let (page, following): (Vec<Pull>, _) = self.get_page(&url).await?;
            let reached_start = page.iter().any(|pr| pr.created_at < start);
            prs.extend(
                page.into_iter()
                    .filter(|pr| range.contains(pr.created_at))
                    .map(PullRequest::from),
            );
            // Sorted newest first, so nothing older can still be in range.
            next = if reached_start { None } else { following };
        }

        debug!(repo = %repo, count = prs.len(), "Fetched GitHub pull requests");
        Ok(prs)
    }

    async fn pull_request_reviews(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>> {
        let url = self.url(&format!(
            "/repos/{}/{}/pulls/{number}/reviews?per_page={PER_PAGE}&page=1",
            repo.owner, repo.name
        ));
        let reviews: Vec<PullReview> = self.get_all(url).await?;
        let mut reviews: Vec<Review> = reviews.into_iter().map(Review::from).collect();

        match self.issue_comments(repo, number).await {
            Ok(comments) => reviews.extend(comments),
            Err(e) => warn!(repo = %repo, pr = number, error = %e, "Failed to fetch issue comments"),
        }
        Ok(reviews)
    }
}
