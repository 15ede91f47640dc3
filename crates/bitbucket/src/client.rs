//! Bitbucket Cloud implementation of the [`Platform`] trait.

use crate::models::{Account, Comment, Page, Pull, PullDetail, Repo, Workspace};
use async_trait::async_trait;
use bugcrawler_core::{
    DateRange, Error, Identity, Platform, PlatformKind, PullRequest, REQUEST_TIMEOUT, RepoRef,
    Repository, Result, Review,
};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Public Bitbucket Cloud API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.bitbucket.org/2.0";

/// Where Atlassian API tokens are created.
pub const TOKEN_URL: &str = "https://id.atlassian.com/manage-profile/security/api-tokens";

const PAGE_LEN: u32 = 50;
const USER_AGENT: &str = concat!("bug-crawler/", env!("CARGO_PKG_VERSION"));
const PLATFORM: PlatformKind = PlatformKind::Bitbucket;

/// Client for the Bitbucket Cloud REST API, authenticated with an
/// Atlassian account email and API token.
#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: Client,
    base_url: String,
    email: String,
    token: SecretString,
}

impl BitbucketClient {
    /// Creates a client for api.bitbucket.org.
    ///
    /// # Errors
    ///
    /// Returns an error if the email or token is empty, or the HTTP client
    /// cannot be built.
    pub fn new(email: impl Into<String>, token: SecretString) -> Result<Self> {
        Self::with_base_url(email, token, DEFAULT_API_URL)
    }

    /// Creates a client for another API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the email or token is empty, or the HTTP client
    /// cannot be built.
    pub fn with_base_url(
        email: impl Into<String>,
        token: SecretString,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let email = email.into().trim().to_string();
        if email.is_empty() || token.expose_secret().trim().is_empty() {
            return Err(Error::credentials(
                PLATFORM,
                "Atlassian account email and API token are required",
            ));
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::http(PLATFORM, format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(%url, "Bitbucket request");
        let response = self
            .http
            .get(url)
            .basic_auth(&self.email, Some(self.token.expose_secret()))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::http(PLATFORM, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::api_with_help(
                PLATFORM,
                status.as_u16(),
                format!("unauthorized for {}", self.email),
                format!(
                    "Check the Atlassian account email and API token. The token needs the scopes \
                     User (Read), Workspace (Read), Repository (Read) and Pull Request (Read), \
                     and can be created at {TOKEN_URL}"
                ),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(PLATFORM, status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::http(PLATFORM, format!("Invalid response from {url}: {e}")))
    }

    /// Follows `next` links until the collection is exhausted.
    async fn get_all<T: DeserializeOwned>(&self, url: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let page: Page<T> = self.get_json(&url).await?;
            items.extend(page.values);
            next = page.next;
        }
        Ok(items)
    }

    async fn approvals(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>> {
        let detail: PullDetail = self
            .get_json(&self.url(&format!(
                "/repositories/{}/{}/pullrequests/{number}",
                repo.owner, repo.name
            )))
            .await?;
        Ok(detail.approvals().collect())
    }
}

#[async_trait]
impl Platform for BitbucketClient {
    fn kind(&self) -> PlatformKind {
        PLATFORM
    }

    async fn verify_token(&self) -> Result<Identity> {
        let account: Account = self.get_json(&self.url("/user")).await?;
        let mut identity = Identity::new(account.login());
        if !account.display_name.is_empty() {
            identity = identity.with_display_name(account.display_name);
        }
        Ok(identity)
    }

    async fn current_user_repositories(&self) -> Result<Vec<Repository>> {
        let workspaces = self.current_user_organizations().await?;
        if workspaces.is_empty() {
            warn!("No workspaces found for the current user");
        }

        let mut repos = Vec::new();
        for workspace in &workspaces {
            match self.organization_repositories(workspace).await {
                Ok(found) => repos.extend(found),
                Err(e) => {
                    warn!(workspace = %workspace, error = %e, "Skipping workspace");
                }
            }
        }
        Ok(repos)
    }

    async fn organization_repositories(&self, workspace: &str) -> Result<Vec<Repository>> {
        let repos: Vec<Repo> = self
            .get_all(self.url(&format!("/repositories/{workspace}?pagelen={PAGE_LEN}")))
            .await?;
        Ok(repos
            .into_iter()
            .map(|r| r.into_repository(workspace))
            .collect())
    }

    async fn current_user_organizations(&self) -> Result<Vec<String>> {
        let workspaces: Vec<Workspace> = self
            .get_all(self.url(&format!("/workspaces?pagelen={PAGE_LEN}")))
            .await?;
        Ok(workspaces.into_iter().map(|w| w.slug).collect())
    }

    async fn pull_requests(&self, repo: &RepoRef, range: &DateRange) -> Result<Vec<PullRequest>> {
        let pulls: Vec<Pull> = self
            .get_all(self.url(&format!(
                "/repositories/{}/{}/pullrequests?state=MERGED&state=OPEN&pagelen={PAGE_LEN}",
                repo.owner, repo.name
            )))
            .await?;

        let prs: Vec<PullRequest> = pulls
            .into_iter()
            .filter(|pr| range.contains(pr.created_on))
            .map(PullRequest::from)
            .collect();
        debug!(repo = %repo, count = prs.len(), "Fetched Bitbucket pull requests");
        Ok(prs)
    }

    async fn pull_request_reviews(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>> {
        let comments: Vec<Comment> = self
            .get_all(self.url(&format!(
                "/repositories/{}/{}/pullrequests/{number}/comments?pagelen={PAGE_LEN}",
                repo.owner, repo.name
            )))
            .await?;
        let mut reviews: Vec<Review> = comments.into_iter().map(Review::from).collect();

        match self.approvals(repo, number).await {
            Ok(approvals) => reviews.extend(approvals),
            Err(e) => warn!(repo = %repo, pr = number, error = %e, "Failed to fetch approvals"),
        }
        Ok(reviews)
    }
}
