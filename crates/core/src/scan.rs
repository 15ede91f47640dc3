//! Concurrent pull request crawling across repositories.

use crate::date::DateRange;
use crate::error::Result;
use crate::platform::{Platform, PullRequest, RepoRef, RepoScan, Review};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Number of concurrent review fetches per repository.
pub const REVIEW_WORKERS: usize = 5;

/// Picks how many repositories to crawl at once.
///
/// Small selections get one worker per repository, medium ones three,
/// and anything above ten gets five.
#[must_use]
pub fn worker_count(repositories: usize) -> usize {
    match repositories {
        0 => 1,
        n @ 1..=2 => n,
        3..=10 => 3,
        _ => 5,
    }
}

/// Parses `owner/name` specs, dropping duplicates while keeping order.
///
/// # Errors
///
/// Returns an error for the first spec that is not of the form `owner/name`.
pub fn parse_repo_specs<S: AsRef<str>>(specs: &[S]) -> Result<Vec<RepoRef>> {
    let mut seen = HashSet::new();
    let mut repos = Vec::new();
    for spec in specs {
        let repo: RepoRef = spec.as_ref().parse()?;
        if seen.insert(repo.to_string()) {
            repos.push(repo);
        }
    }
    Ok(repos)
}

/// Fetches pull requests from every repository with up to `workers` requests in flight.
///
/// Results come back in the same order as `repos`. A failing repository
/// carries its error instead of aborting the others.
pub async fn scan_repositories(
    platform: &dyn Platform,
    repos: &[RepoRef],
    range: &DateRange,
    workers: usize,
) -> Vec<RepoScan> {
    let workers = workers.max(1);
    info!(
        platform = %platform.kind(),
        repositories = repos.len(),
        workers,
        "Crawling pull requests"
    );

    stream::iter(repos.iter().cloned())
        .map(|repo| async move {
            let result = platform.pull_requests(&repo, range).await;
            match &result {
                Ok(prs) => debug!(repo = %repo, count = prs.len(), "Fetched pull requests"),
                Err(e) => warn!(repo = %repo, error = %e, "Failed to fetch pull requests"),
            }
            RepoScan { repo, result }
        })
        .buffered(workers)
        .collect()
        .await
}

/// Fetches reviews for the given pull request numbers with [`REVIEW_WORKERS`] in flight.
///
/// Pull requests whose reviews cannot be fetched are left out of the map.
pub async fn fetch_reviews(
    platform: &dyn Platform,
    repo: &RepoRef,
    numbers: &[u64],
) -> HashMap<u64, Vec<Review>> {
    stream::iter(numbers.iter().copied())
        .map(|number| async move { (number, platform.pull_request_reviews(repo, number).await) })
        .buffer_unordered(REVIEW_WORKERS)
        .filter_map(|(number, result)| async move {
            match result {
                Ok(reviews) => Some((number, reviews)),
                Err(e) => {
                    warn!(repo = %repo, pr = number, error = %e, "Skipping reviews");
                    None
                }
            }
        })
        .collect()
        .await
}

/// Fills in the `reviews` field of each pull request.
pub async fn attach_reviews(platform: &dyn Platform, repo: &RepoRef, prs: &mut [PullRequest]) {
    let numbers: Vec<u64> = prs.iter().map(|pr| pr.number).collect();
    let mut reviews = fetch_reviews(platform, repo, &numbers).await;
    for pr in prs {
        if let Some(found) = reviews.remove(&pr.number) {
            pr.reviews = found;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::platform::{Identity, PlatformKind, PrStatus, Repository, ReviewState};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakePlatform {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakePlatform {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    fn pr(number: u64) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {number}"),
            description: String::new(),
            author: "dev".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
            merged_at: None,
            labels: vec![],
            url: String::new(),
            status: PrStatus::Open,
            reviews: vec![],
        }
    }

    #[async_trait]
    impl Platform for FakePlatform {
        fn kind(&self) -> PlatformKind {
            PlatformKind::GitHub
        }

        async fn verify_token(&self) -> Result<Identity> {
            Ok(Identity::new("tester"))
        }

        async fn current_user_repositories(&self) -> Result<Vec<Repository>> {
            Ok(vec![])
        }

        async fn organization_repositories(&self, _org: &str) -> Result<Vec<Repository>> {
            Ok(vec![])
        }

        async fn current_user_organizations(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn pull_requests(&self, repo: &RepoRef, _range: &DateRange) -> Result<Vec<PullRequest>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Later repositories finish first so ordering is actually exercised.
            let delay = if repo.name == "slow" { 30 } else { 5 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if repo.name == "broken" {
                return Err(Error::api(PlatformKind::GitHub, 404, "Not Found"));
            }
            Ok(vec![pr(1), pr(2)])
        }

        async fn pull_request_reviews(&self, _repo: &RepoRef, number: u64) -> Result<Vec<Review>> {
            if number == 2 {
                return Err(Error::http(PlatformKind::GitHub, "timeout"));
            }
            Ok(vec![Review {
                reviewer: "alice".to_string(),
                state: ReviewState::Approved,
                submitted_at: None,
                body: String::new(),
            }])
        }
    }

    fn range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    #[test]
    fn test_worker_count_policy() {
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert_eq!(worker_count(2), 2);
        assert_eq!(worker_count(3), 3);
        assert_eq!(worker_count(10), 3);
        assert_eq!(worker_count(11), 5);
        assert_eq!(worker_count(200), 5);
    }

    #[test]
    fn test_parse_repo_specs_dedups() {
        let repos = parse_repo_specs(&["a/one", "b/two", "a/one"]).unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].to_string(), "a/one");
        assert_eq!(repos[1].to_string(), "b/two");
    }

    #[test]
    fn test_parse_repo_specs_rejects_invalid() {
        assert!(parse_repo_specs(&["a/one", "bogus"]).is_err());
    }

    #[tokio::test]
    async fn test_scan_preserves_order_and_errors() {
        let platform = FakePlatform::new();
        let repos = vec![
            RepoRef::new("acme", "slow"),
            RepoRef::new("acme", "broken"),
            RepoRef::new("acme", "fast"),
        ];

        let results = scan_repositories(&platform, &repos, &range(), 3).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].repo.name, "slow");
        assert_eq!(results[1].repo.name, "broken");
        assert_eq!(results[2].repo.name, "fast");
        assert_eq!(results[0].result.as_ref().unwrap().len(), 2);
        assert!(results[1].result.is_err());
        assert!(results[2].result.is_ok());
    }

    #[tokio::test]
    async fn test_scan_respects_worker_limit() {
        let platform = FakePlatform::new();
        let repos: Vec<RepoRef> = (0..8).map(|i| RepoRef::new("acme", format!("r{i}"))).collect();

        let _ = scan_repositories(&platform, &repos, &range(), 2).await;

        assert!(platform.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_attach_reviews_skips_failures() {
        let platform = FakePlatform::new();
        let repo = RepoRef::new("acme", "app");
        let mut prs = vec![pr(1), pr(2)];

        attach_reviews(&platform, &repo, &mut prs).await;

        assert_eq!(prs[0].reviews.len(), 1);
        assert!(prs[1].reviews.is_empty());
    }
}
