//! bug-crawler binary.
//!
//! Formula commands run synchronously; `scan` gets a multi-threaded tokio
//! runtime.

// The panic hook and runtime failure paths print before tracing exists.
#![allow(clippy::print_stderr)]

use bug_crawler::cli::{
    self, CliError, Commands, EXIT_OK, EXIT_RUNTIME, ScanArgs, exit_code_for, render_error,
};
use bug_crawler::commands;
use bug_crawler::prompt::TerminalPrompter;
use bug_crawler::tracing::{self, TracingConfig};
use bugcrawler_core::CredentialStore;
use std::io;

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        ..Default::default()
    };
    if let Err(e) = tracing::init_tracing(tracing_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = match &cli.command {
        Commands::Formula(command) => {
            commands::formula::execute(command, &mut io::stdout().lock(), &mut io::stderr())
        }
        Commands::Scan(args) => run_scan(args),
    };

    let code = match result {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run_scan(args: &ScanArgs) -> Result<(), CliError> {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_RUNTIME);
        }
    };

    let store = CredentialStore::with_default_dir()?;
    let mut prompter = TerminalPrompter::new();
    let summary = rt.block_on(commands::scan::execute(
        args,
        &store,
        &mut prompter,
        &mut io::stdout().lock(),
        &mut io::stderr(),
    ))?;
    ::tracing::debug!(
        repositories = summary.repositories,
        failed = summary.failed_repositories,
        prs = summary.total_prs,
        "Scan complete"
    );
    Ok(())
}
