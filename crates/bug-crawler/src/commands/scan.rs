//! `bug-crawler scan`: crawl pull requests and report on them.
//!
//! The flow mirrors what a user would otherwise answer step by step:
//! platform, credentials, scan mode, repositories, date range and bug
//! type. Every step can be answered with a flag; anything missing is asked
//! through a [`Prompter`]. Progress lines go to `status`, the report to `out`.

use crate::cli::{BugType, CliError, RepoSource, ReportFormat, ScanArgs, ScanMode};
use crate::prompt::Prompter;
use bugcrawler_analyzer::{BugAnalyzer, BugResult, BugScanMode, PrRuleAnalyzer};
use bugcrawler_backlog::{BacklogClient, DEFAULT_DOMAIN};
use bugcrawler_bitbucket::{BitbucketClient, TOKEN_URL};
use bugcrawler_core::date::{DATE_FORMAT, parse_date};
use bugcrawler_core::scan::{attach_reviews, parse_repo_specs, scan_repositories, worker_count};
use bugcrawler_core::{
    CredentialStore, DateRange, Error as CoreError, Platform, PlatformKind, PullRequest, RepoRef,
    Repository,
};
use bugcrawler_github::GitHubClient;
use bugcrawler_report::{
    BUG_REPORT_FILE, BugReport, RuleReport, RuleStatistics, Statistics, export_bug_csv,
    export_rules_csv, write_details, write_json, write_rule_details, write_rule_summary,
    write_summary,
};
use chrono::{Days, NaiveDate, Utc};
use secrecy::SecretString;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Days before today offered as the default start date.
const DEFAULT_LOOKBACK_DAYS: u64 = 30;

const BACKLOG_DOMAINS: &[&str] = &["backlog.com", "backlog.jp"];

/// What a finished scan produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Repositories that were crawled
    pub repositories: usize,
    /// Repositories whose pull requests could not be fetched
    pub failed_repositories: usize,
    /// Pull requests inside the date range
    pub total_prs: usize,
    /// CSV report, when one was written
    pub report_file: Option<PathBuf>,
}

/// Runs the scan.
///
/// # Errors
///
/// Returns a configuration error for missing or invalid choices and a
/// runtime error when the host cannot be reached, every repository fails
/// or the report cannot be written.
#[instrument(name = "scan", skip_all)]
pub async fn execute<O: Write, S: Write>(
    args: &ScanArgs,
    store: &CredentialStore,
    prompter: &mut dyn Prompter,
    out: &mut O,
    status: &mut S,
) -> Result<ScanSummary, CliError> {
    let repo_flags = parse_repo_specs(&args.repos)?;
    let kind = select_platform(args, prompter)?;
    let client = connect(kind, args, store, prompter, status)?;

    let identity = client.verify_token().await?;
    let name = identity
        .display_name
        .as_deref()
        .map_or_else(String::new, |n| format!(" ({n})"));
    say(status, &format!("✓ Authenticated as {}{name}", identity.login))?;
    if let (Some(remaining), Some(limit)) = (identity.rate_remaining, identity.rate_limit) {
        say(status, &format!("  API rate limit: {remaining}/{limit} remaining"))?;
    }

    let mode = select_mode(args, prompter)?;
    let repos = select_repositories(client.as_ref(), args, repo_flags, prompter, status).await?;
    let range = select_date_range(args, prompter, Utc::now().date_naive())?;
    say(
        status,
        &format!(
            "✓ Pull requests created from {} to {}",
            range.start(),
            range.end()
        ),
    )?;
    let bug_type = match mode {
        ScanMode::Bug => Some(select_bug_type(args, prompter)?),
        ScanMode::PrRules => None,
    };

    let (prs, failed) = crawl(client.as_ref(), &repos, &range, mode, status).await?;
    if failed == repos.len() {
        return Err(CliError::Runtime {
            message: format!("Failed to fetch pull requests from all {failed} repositories"),
            help: Some("Run with -L debug for request details".to_string()),
        });
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let report_file = match bug_type {
        Some(bug_type) => report_bugs(&prs, bug_type.into(), args.format, &output_dir, out, status)?,
        None => Some(report_rules(&prs, args.format, &output_dir, out, status)?),
    };

    Ok(ScanSummary {
        repositories: repos.len(),
        failed_repositories: failed,
        total_prs: prs.len(),
        report_file,
    })
}

fn say<S: Write>(status: &mut S, line: &str) -> Result<(), CliError> {
    writeln!(status, "{line}").map_err(|e| CliError::runtime(format!("Failed to write output: {e}")))
}

fn missing_flag(flag: &str, what: &str) -> CliError {
    CliError::config_with_help(
        format!("No {what} given and stdin is not a terminal"),
        format!("Pass {flag} or run in an interactive terminal"),
    )
}

/// Asks for one of `choices` unless a value was already given.
fn choose<T: Copy>(
    prompter: &mut dyn Prompter,
    given: Option<T>,
    flag: &str,
    prompt: &str,
    choices: &[(T, &str)],
) -> Result<T, CliError> {
    if let Some(value) = given {
        return Ok(value);
    }
    if !prompter.is_interactive() {
        return Err(missing_flag(flag, prompt.to_lowercase().as_str()));
    }
    let labels: Vec<String> = choices.iter().map(|(_, label)| (*label).to_string()).collect();
    let index = prompter.select(prompt, &labels)?;
    choices
        .get(index)
        .map(|(value, _)| *value)
        .ok_or_else(|| CliError::config(format!("Invalid choice for {prompt}")))
}

fn select_platform(args: &ScanArgs, prompter: &mut dyn Prompter) -> Result<PlatformKind, CliError> {
    let choices: Vec<(PlatformKind, &str)> = PlatformKind::all()
        .iter()
        .map(|kind| (*kind, kind.display_name()))
        .collect();
    choose(
        prompter,
        args.platform.map(PlatformKind::from),
        "--platform",
        "Platform",
        &choices,
    )
}

fn select_mode(args: &ScanArgs, prompter: &mut dyn Prompter) -> Result<ScanMode, CliError> {
    let choices = [
        (ScanMode::Bug, ScanMode::Bug.label()),
        (ScanMode::PrRules, ScanMode::PrRules.label()),
    ];
    choose(prompter, args.mode, "--mode", "Scan mode", &choices)
}

fn select_bug_type(args: &ScanArgs, prompter: &mut dyn Prompter) -> Result<BugType, CliError> {
    let choices = [
        (BugType::Label, "Labels (bug, fix, hotfix, ...) and `type: bug`"),
        (BugType::BugReview, "`bug_review: N` in the description"),
    ];
    choose(prompter, args.bug_type, "--bug-type", "Bug type", &choices)
}

/// Uses a flag value, then a saved value, then asks. The flag is `true`
/// when the value did not come from the store.
fn resolve_value(
    given: Option<&str>,
    saved: Option<String>,
    prompter: &mut dyn Prompter,
    flag: &str,
    prompt: &str,
) -> Result<(String, bool), CliError> {
    if let Some(value) = given.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok((value.to_string(), true));
    }
    if let Some(value) = saved {
        return Ok((value, false));
    }
    if !prompter.is_interactive() {
        return Err(missing_flag(flag, &prompt.to_lowercase()));
    }
    Ok((prompter.input(prompt, None)?, true))
}

fn resolve_token<S: Write>(
    kind: PlatformKind,
    store: &CredentialStore,
    prompter: &mut dyn Prompter,
    status: &mut S,
) -> Result<(SecretString, bool), CliError> {
    match store.token(kind) {
        Ok(token) => Ok((token, false)),
        Err(CoreError::Credentials { .. }) if prompter.is_interactive() => {
            let prompt = match kind {
                PlatformKind::GitHub => "GitHub personal access token",
                PlatformKind::Bitbucket => {
                    say(status, &format!("Create an API token at {TOKEN_URL}"))?;
                    "Bitbucket API token"
                }
                PlatformKind::Backlog => "Backlog API key",
            };
            Ok((prompter.secret(prompt)?, true))
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolves credentials, optionally saves them and builds the client.
fn connect<S: Write>(
    kind: PlatformKind,
    args: &ScanArgs,
    store: &CredentialStore,
    prompter: &mut dyn Prompter,
    status: &mut S,
) -> Result<Box<dyn Platform>, CliError> {
    let (token, mut fresh) = resolve_token(kind, store, prompter, status)?;

    let mut email = None;
    let mut space = None;
    let mut domain = None;
    match kind {
        PlatformKind::GitHub => {}
        PlatformKind::Bitbucket => {
            let (value, entered) = resolve_value(
                args.email.as_deref(),
                store.bitbucket_email()?,
                prompter,
                "--email",
                "Atlassian account email",
            )?;
            fresh |= entered;
            email = Some(value);
        }
        PlatformKind::Backlog => {
            let (value, entered) = resolve_value(
                args.space.as_deref(),
                store.backlog_space()?,
                prompter,
                "--space",
                "Backlog space ID",
            )?;
            fresh |= entered;
            space = Some(value);

            let (value, entered) = match (args.domain.as_deref(), store.backlog_domain()?) {
                (Some(d), _) if !d.trim().is_empty() => (d.trim().to_string(), true),
                (_, Some(saved)) => (saved, false),
                _ if prompter.is_interactive() => {
                    let options: Vec<String> =
                        BACKLOG_DOMAINS.iter().map(|d| (*d).to_string()).collect();
                    let index = prompter.select("Backlog domain", &options)?;
                    let chosen = BACKLOG_DOMAINS.get(index).copied().unwrap_or(DEFAULT_DOMAIN);
                    (chosen.to_string(), true)
                }
                _ => (DEFAULT_DOMAIN.to_string(), false),
            };
            fresh |= entered;
            domain = Some(value);
        }
    }

    let save = args.save_credentials
        || (fresh
            && prompter.is_interactive()
            && prompter.confirm("Save credentials for future runs?", true)?);
    if save {
        store.save_token(kind, &token)?;
        if let Some(email) = &email {
            store.save_bitbucket_email(email)?;
        }
        if let Some(space) = &space {
            store.save_backlog_space(space)?;
        }
        if let Some(domain) = &domain {
            store.save_backlog_domain(domain)?;
        }
        say(
            status,
            &format!("✓ Credentials saved to {}", store.config_dir().display()),
        )?;
    }

    let api_url = args.api_url.as_deref();
    let client: Box<dyn Platform> = match kind {
        PlatformKind::GitHub => Box::new(match api_url {
            Some(url) => GitHubClient::with_base_url(token, url)?,
            None => GitHubClient::new(token)?,
        }),
        PlatformKind::Bitbucket => {
            let email = email.unwrap_or_default();
            Box::new(match api_url {
                Some(url) => BitbucketClient::with_base_url(email, token, url)?,
                None => BitbucketClient::new(email, token)?,
            })
        }
        PlatformKind::Backlog => {
            let space = space.unwrap_or_default();
            Box::new(match api_url {
                Some(url) => BacklogClient::with_urls(&space, token, url, url)?,
                None => BacklogClient::new(&space, token, domain.as_deref())?,
            })
        }
    };
    info!(platform = %kind, "Client ready");
    Ok(client)
}

/// Finds the repositories to crawl and lets the user narrow them down.
async fn select_repositories<S: Write>(
    platform: &dyn Platform,
    args: &ScanArgs,
    given: Vec<RepoRef>,
    prompter: &mut dyn Prompter,
    status: &mut S,
) -> Result<Vec<RepoRef>, CliError> {
    if !given.is_empty() {
        print_selection(status, &given)?;
        return Ok(given);
    }

    let given_source = args
        .source
        .or_else(|| (!args.orgs.is_empty()).then_some(RepoSource::Org));
    let source = choose(
        prompter,
        given_source,
        "--source or --repo",
        "Repository source",
        &[
            (RepoSource::User, "My repositories"),
            (RepoSource::Org, "Organization repositories"),
        ],
    )?;

    let discovered = match source {
        RepoSource::User => platform.current_user_repositories().await?,
        RepoSource::Org => {
            let orgs = select_organizations(platform, args, prompter).await?;
            organization_repositories(platform, &orgs, status).await?
        }
    };
    if discovered.is_empty() {
        return Err(CliError::config_with_help(
            "No repositories found",
            "Check the token's access or pass --repo owner/name",
        ));
    }
    say(status, &format!("✓ Found {} repositories", discovered.len()))?;

    let chosen: Vec<&Repository> = if prompter.is_interactive() {
        let names: Vec<String> = discovered.iter().map(|r| r.full_name.clone()).collect();
        prompter
            .multi_select("Repositories", &names)?
            .into_iter()
            .filter_map(|i| discovered.get(i))
            .collect()
    } else {
        info!(count = discovered.len(), "No terminal, crawling every discovered repository");
        discovered.iter().collect()
    };
    if chosen.is_empty() {
        return Err(CliError::config("Select at least one repository"));
    }

    let repos: Vec<RepoRef> = chosen
        .into_iter()
        .map(|r| RepoRef::new(r.owner.as_str(), r.name.as_str()))
        .collect();
    print_selection(status, &repos)?;
    Ok(repos)
}

async fn select_organizations(
    platform: &dyn Platform,
    args: &ScanArgs,
    prompter: &mut dyn Prompter,
) -> Result<Vec<String>, CliError> {
    if !args.orgs.is_empty() {
        return Ok(args.orgs.clone());
    }
    if !prompter.is_interactive() {
        return Err(missing_flag("--org", "organization"));
    }
    let orgs = platform.current_user_organizations().await?;
    if orgs.is_empty() {
        return Err(CliError::config_with_help(
            "You are not a member of any organization",
            "Use --source user or pass --org explicitly",
        ));
    }
    let chosen = prompter.multi_select("Organizations", &orgs)?;
    Ok(chosen.into_iter().filter_map(|i| orgs.get(i).cloned()).collect())
}

/// Lists repositories of every organization, skipping ones that fail and
/// dropping duplicates by full name.
async fn organization_repositories<S: Write>(
    platform: &dyn Platform,
    orgs: &[String],
    status: &mut S,
) -> Result<Vec<Repository>, CliError> {
    let mut seen = HashSet::new();
    let mut repos = Vec::new();
    for org in orgs {
        match platform.organization_repositories(org).await {
            Ok(found) => {
                say(status, &format!("✓ {org}: {} repositories", found.len()))?;
                repos.extend(found.into_iter().filter(|r| seen.insert(r.full_name.clone())));
            }
            Err(e) => {
                warn!(org = %org, error = %e, "Skipping organization");
                say(status, &format!("✗ {org}: {e}"))?;
            }
        }
    }
    Ok(repos)
}

fn print_selection<S: Write>(status: &mut S, repos: &[RepoRef]) -> Result<(), CliError> {
    say(status, &format!("Selected repositories ({}):", repos.len()))?;
    for (i, repo) in repos.iter().enumerate() {
        say(status, &format!("{:>3}. {repo}", i + 1))?;
    }
    Ok(())
}

/// Builds the date range from flags or prompts. Without a terminal the end
/// date defaults to `today`.
fn select_date_range(
    args: &ScanArgs,
    prompter: &mut dyn Prompter,
    today: NaiveDate,
) -> Result<DateRange, CliError> {
    let start = match args.since.as_deref() {
        Some(value) => parse_date(value)?,
        None if prompter.is_interactive() => {
            let default = today
                .checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS))
                .unwrap_or(today)
                .format(DATE_FORMAT)
                .to_string();
            parse_date(&prompter.input("Start date (YYYY-MM-DD)", Some(&default))?)?
        }
        None => return Err(missing_flag("--since", "start date")),
    };
    let end = match args.until.as_deref() {
        Some(value) => parse_date(value)?,
        None if prompter.is_interactive() => {
            let default = today.format(DATE_FORMAT).to_string();
            parse_date(&prompter.input("End date (YYYY-MM-DD)", Some(&default))?)?
        }
        None => today,
    };
    Ok(DateRange::new(start, end)?)
}

/// Fetches pull requests from every repository, attaching reviews in
/// review-rule mode. Returns the pull requests and the number of failed
/// repositories.
async fn crawl<S: Write>(
    platform: &dyn Platform,
    repos: &[RepoRef],
    range: &DateRange,
    mode: ScanMode,
    status: &mut S,
) -> Result<(Vec<PullRequest>, usize), CliError> {
    let workers = worker_count(repos.len());
    say(
        status,
        &format!(
            "Scanning {} repositories with {workers} workers...",
            repos.len()
        ),
    )?;

    let started = Instant::now();
    let mut prs = Vec::new();
    let mut failed = 0;
    for scan in scan_repositories(platform, repos, range, workers).await {
        match scan.result {
            Ok(mut found) => {
                say(status, &format!("✓ {}: {} PR", scan.repo, found.len()))?;
                if mode == ScanMode::PrRules {
                    attach_reviews(platform, &scan.repo, &mut found).await;
                }
                prs.extend(found);
            }
            Err(e) => {
                failed += 1;
                say(status, &format!("✗ {}: {e}", scan.repo))?;
            }
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    info!(total = prs.len(), failed, elapsed, "Crawl finished");
    say(status, &format!("✓ Crawl finished in {elapsed:.2}s"))?;
    Ok((prs, failed))
}

/// Keeps non-bug results and the bug results the chosen detection reports.
fn filter_by_type(results: Vec<BugResult>, mode: BugScanMode) -> Vec<BugResult> {
    results
        .into_iter()
        .filter(|r| !r.is_bug_related || r.detection.is_some_and(|d| mode.reports(d)))
        .collect()
}

fn report_bugs<O: Write, S: Write>(
    prs: &[PullRequest],
    mode: BugScanMode,
    format: ReportFormat,
    output_dir: &Path,
    out: &mut O,
    status: &mut S,
) -> Result<Option<PathBuf>, CliError> {
    let results = filter_by_type(BugAnalyzer::new().analyze_all(prs, mode), mode);

    match format {
        ReportFormat::Table => {
            write_summary(out, &Statistics::from_results(&results, prs.len()))?;
            write_details(out, &results)?;
        }
        ReportFormat::Json => write_json(out, &BugReport::new(&results, prs.len()))?,
    }

    let written = export_bug_csv(output_dir, &results)?;
    match &written {
        Some(path) => say(status, &format!("✓ Report saved to {}", path.display()))?,
        None => say(
            status,
            &format!("No bug-related pull requests, {BUG_REPORT_FILE} not written"),
        )?,
    }
    Ok(written)
}

fn report_rules<O: Write, S: Write>(
    prs: &[PullRequest],
    format: ReportFormat,
    output_dir: &Path,
    out: &mut O,
    status: &mut S,
) -> Result<PathBuf, CliError> {
    let results = PrRuleAnalyzer::new().analyze(prs);

    match format {
        ReportFormat::Table => {
            write_rule_summary(out, &RuleStatistics::from_results(&results))?;
            write_rule_details(out, &results)?;
        }
        ReportFormat::Json => write_json(out, &RuleReport::new(&results))?,
    }

    let path = export_rules_csv(output_dir, &results)?;
    say(status, &format!("✓ Report saved to {}", path.display()))?;
    Ok(path)
}
