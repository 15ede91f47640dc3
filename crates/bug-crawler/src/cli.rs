//! Command line definition and error reporting.

use crate::tracing::{LogLevel, TracingFormat};
use bugcrawler_analyzer::BugScanMode;
use bugcrawler_core::PlatformKind;
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Success exit code
pub const EXIT_OK: i32 = 0;

/// Lint or history checks found problems
pub const EXIT_FAILED: i32 = 1;

/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;

/// Network, API or I/O error exit code
pub const EXIT_RUNTIME: i32 = 3;

/// Environment variable that points every platform client at another API root.
pub const API_URL_ENV: &str = "BUG_CRAWLER_API_URL";

/// Errors surfaced to the user by the binary.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Checks ran and found problems (exit code 1)
    #[error("{message}")]
    #[diagnostic(code(bug_crawler::cli::failed))]
    Failed {
        /// The error message
        message: String,
    },
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(bug_crawler::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Network, API or I/O error (exit code 3)
    #[error("Runtime error: {message}")]
    #[diagnostic(code(bug_crawler::cli::runtime))]
    Runtime {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new failed-checks error
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new runtime error
    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
            help: None,
        }
    }
}

fn help_of(err: &dyn Diagnostic) -> Option<String> {
    err.help().map(|h| h.to_string())
}

/// Configuration mistakes map to exit code 2, everything that happened
/// while talking to a host or the filesystem maps to exit code 3.
impl From<bugcrawler_core::Error> for CliError {
    fn from(err: bugcrawler_core::Error) -> Self {
        use bugcrawler_core::Error as E;
        let help = help_of(&err);
        match err {
            E::Configuration { message, help } => Self::Config { message, help },
            E::Credentials { .. } | E::InvalidRepository { .. } | E::InvalidDateRange { .. } => {
                Self::Config {
                    message: err.to_string(),
                    help,
                }
            }
            E::Api { .. } | E::Http { .. } | E::Io { .. } | E::Json(_) => Self::Runtime {
                message: err.to_string(),
                help,
            },
        }
    }
}

impl From<bugcrawler_homebrew::Error> for CliError {
    fn from(err: bugcrawler_homebrew::Error) -> Self {
        use bugcrawler_homebrew::Error as E;
        let help = help_of(&err);
        match err {
            E::Parse { .. } => Self::failed(err.to_string()),
            E::InvalidTarget { .. } | E::InvalidDescriptor { .. } => Self::Config {
                message: err.to_string(),
                help,
            },
            E::Checksum { .. } => Self::Runtime {
                message: err.to_string(),
                help,
            },
        }
    }
}

impl From<bugcrawler_report::Error> for CliError {
    fn from(err: bugcrawler_report::Error) -> Self {
        Self::Runtime {
            message: err.to_string(),
            help: Some("Check that the output directory is writable".to_string()),
        }
    }
}

/// Map CLI error to its exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Failed { .. } => EXIT_FAILED,
        CliError::Config { .. } => EXIT_CLI,
        CliError::Runtime { .. } => EXIT_RUNTIME,
    }
}

/// Print an error to stderr through miette.
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{report:?}");
    let _ = stderr.flush();
}

/// bug-crawler command line.
#[derive(Parser, Debug)]
#[command(
    name = "bug-crawler",
    version,
    about = "Measure bug rates and review compliance across pull requests",
    long_about = None
)]
pub struct Cli {
    /// Log level for diagnostics on stderr
    #[arg(short = 'L', long, global = true, value_enum, default_value = "warn")]
    pub level: LogLevel,

    /// Log output format
    #[arg(long = "log-format", global = true, value_enum, default_value = "compact")]
    pub log_format: TracingFormat,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl pull requests and write a bug or review-rule report
    Scan(ScanArgs),
    /// Lint, check and render Homebrew formulas
    #[command(subcommand)]
    Formula(FormulaCommand),
}

/// Git hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    /// github.com
    Github,
    /// Bitbucket Cloud
    Bitbucket,
    /// Nulab Backlog
    Backlog,
}

impl From<PlatformArg> for PlatformKind {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Github => Self::GitHub,
            PlatformArg::Bitbucket => Self::Bitbucket,
            PlatformArg::Backlog => Self::Backlog,
        }
    }
}

/// What a scan reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScanMode {
    /// Bug-related pull requests
    Bug,
    /// Code review compliance
    PrRules,
}

impl ScanMode {
    /// Label shown in menus.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bug => "Bug scan (bug-related pull requests)",
            Self::PrRules => "PR rules scan (code review compliance)",
        }
    }
}

/// How bug-related PRs are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BugType {
    /// Labels and `type: bug` in the description
    Label,
    /// `bug_review: N` tags in the description
    BugReview,
}

impl From<BugType> for BugScanMode {
    fn from(arg: BugType) -> Self {
        match arg {
            BugType::Label => Self::Label,
            BugType::BugReview => Self::BugReview,
        }
    }
}

/// Where repositories are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepoSource {
    /// Repositories of the authenticated user
    User,
    /// Repositories of one or more organizations
    Org,
}

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Summary and details tables
    #[default]
    Table,
    /// JSON document on stdout
    Json,
}

/// Options of `bug-crawler scan`. Anything left out is prompted for.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Platform to crawl
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,

    /// Scan mode
    #[arg(long, value_enum)]
    pub mode: Option<ScanMode>,

    /// Bug detection method (bug mode only)
    #[arg(long = "bug-type", value_enum)]
    pub bug_type: Option<BugType>,

    /// Repository source
    #[arg(long, value_enum)]
    pub source: Option<RepoSource>,

    /// Organization, workspace or project key to crawl (repeatable)
    #[arg(long = "org", value_name = "NAME")]
    pub orgs: Vec<String>,

    /// Repository to crawl as owner/name (repeatable)
    #[arg(long = "repo", value_name = "OWNER/NAME")]
    pub repos: Vec<String>,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,

    /// Directory for CSV reports
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report format on stdout
    #[arg(long, value_enum, default_value = "table")]
    pub format: ReportFormat,

    /// Save entered credentials without asking
    #[arg(long = "save-credentials")]
    pub save_credentials: bool,

    /// Atlassian account email (Bitbucket)
    #[arg(long, env = "BITBUCKET_EMAIL")]
    pub email: Option<String>,

    /// Space ID (Backlog)
    #[arg(long, env = "BACKLOG_SPACE")]
    pub space: Option<String>,

    /// Domain, backlog.com or backlog.jp (Backlog)
    #[arg(long, env = "BACKLOG_DOMAIN")]
    pub domain: Option<String>,

    /// Override the API root of the selected platform
    #[arg(long = "api-url", env = API_URL_ENV, hide = true)]
    pub api_url: Option<String>,
}

/// `bug-crawler formula` subcommands.
#[derive(Subcommand, Debug)]
pub enum FormulaCommand {
    /// Lint formula files
    Lint {
        /// Formula files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Treat warnings as failures
        #[arg(long = "deny-warnings")]
        deny_warnings: bool,
    },
    /// Check version ordering across formula revisions, oldest first
    History {
        /// Formula files in historical order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Render a formula for a release
    Render(RenderArgs),
}

/// Options of `bug-crawler formula render`.
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Package name
    #[arg(long, default_value = "bug-crawler")]
    pub name: String,

    /// Release version without the leading `v`
    #[arg(long)]
    pub version: String,

    /// Source repository as owner/name
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: String,

    /// One-line description
    #[arg(long)]
    pub desc: Option<String>,

    /// Project homepage
    #[arg(long)]
    pub homepage: Option<String>,

    /// License identifier
    #[arg(long)]
    pub license: Option<String>,

    /// Checksum of a release asset as target=hex (repeatable)
    #[arg(long = "sha256", value_name = "TARGET=HEX")]
    pub checksums: Vec<String>,

    /// Release asset to hash as target=path (repeatable)
    #[arg(long = "artifact", value_name = "TARGET=PATH")]
    pub artifacts: Vec<String>,

    /// Test with `--version` instead of `--help`
    #[arg(long = "version-test")]
    pub version_test: bool,

    /// Write the formula here instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Parse the process arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
