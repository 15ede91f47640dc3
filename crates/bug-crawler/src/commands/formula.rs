//! `bug-crawler formula`: lint, history checks and rendering of Homebrew formulas.

use crate::cli::{CliError, FormulaCommand, RenderArgs};
use bugcrawler_homebrew::{
    DescriptorBuilder, Finding, FormulaGenerator, HistoryEntry, ReleaseTarget, check_history,
    lint_source, parse_formula,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Runs a formula subcommand. Results go to `out`, progress to `status`.
///
/// # Errors
///
/// Returns [`CliError::Failed`] when files do not pass, and other variants
/// for bad input or I/O failures.
pub fn execute<O: Write, S: Write>(
    command: &FormulaCommand,
    out: &mut O,
    status: &mut S,
) -> Result<(), CliError> {
    match command {
        FormulaCommand::Lint {
            files,
            deny_warnings,
        } => lint_files(files, *deny_warnings, out),
        FormulaCommand::History { files } => check_files(files, out),
        FormulaCommand::Render(args) => render(args, out, status),
    }
}

fn read_formula(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Runtime {
        message: format!("Failed to read {}: {e}", path.display()),
        help: Some("Check that the file exists and is readable".to_string()),
    })
}

fn write_finding<W: Write>(w: &mut W, origin: &str, finding: &Finding) -> io::Result<()> {
    match finding.line {
        Some(line) => writeln!(
            w,
            "{origin}:{line}: {}[{}]: {}",
            finding.severity, finding.code, finding.message
        ),
        None => writeln!(
            w,
            "{origin}: {}[{}]: {}",
            finding.severity, finding.code, finding.message
        ),
    }
}

/// Lints every file and prints one line per finding.
///
/// # Errors
///
/// Returns [`CliError::Failed`] when any file has errors, or warnings with
/// `deny_warnings` set.
pub fn lint_files<W: Write>(
    files: &[PathBuf],
    deny_warnings: bool,
    out: &mut W,
) -> Result<(), CliError> {
    let mut failed = 0usize;
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for path in files {
        let origin = path.display().to_string();
        let source = read_formula(path)?;
        let report = match lint_source(&source) {
            Ok(report) => report,
            Err(e) => {
                writeln!(out, "{origin}: error[parse]: {e}").map_err(output_error)?;
                failed += 1;
                errors += 1;
                continue;
            }
        };

        for finding in report.findings() {
            write_finding(out, &origin, finding).map_err(output_error)?;
        }
        errors += report.error_count();
        warnings += report.warning_count();
        if report.fails(deny_warnings) {
            failed += 1;
        }
        debug!(file = %origin, findings = report.findings().len(), "Linted formula");
    }

    writeln!(
        out,
        "{} file(s) checked: {errors} error(s), {warnings} warning(s)",
        files.len()
    )
    .map_err(output_error)?;

    if failed > 0 {
        return Err(CliError::failed(format!(
            "{failed} of {} formula file(s) failed lint",
            files.len()
        )));
    }
    Ok(())
}

/// Checks that the files, taken as one history in the given order, only
/// ever move versions forward.
///
/// # Errors
///
/// Returns [`CliError::Failed`] when a file cannot be parsed or the
/// history has violations.
pub fn check_files<W: Write>(files: &[PathBuf], out: &mut W) -> Result<(), CliError> {
    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let origin = path.display().to_string();
        let parsed = parse_formula(&read_formula(path)?)
            .map_err(|e| CliError::failed(format!("{origin}: {e}")))?;
        entries.push(HistoryEntry::new(origin, parsed.descriptor));
    }

    let violations = check_history(&entries);
    for v in &violations {
        writeln!(out, "{}: error[{}]: {}", v.label, v.code, v.message).map_err(output_error)?;
    }

    if violations.is_empty() {
        writeln!(out, "{} revision(s) checked: history is in order", entries.len())
            .map_err(output_error)?;
        Ok(())
    } else {
        Err(CliError::failed(format!(
            "{} history violation(s) found",
            violations.len()
        )))
    }
}

fn split_assignment<'a>(spec: &'a str, flag: &str) -> Result<(ReleaseTarget, &'a str), CliError> {
    let Some((target, value)) = spec.split_once('=') else {
        return Err(CliError::config_with_help(
            format!("Invalid {flag} value: {spec}"),
            format!("Use {flag} <target>=<value>, e.g. linux-amd64=..."),
        ));
    };
    Ok((target.trim().parse()?, value.trim()))
}

/// Builds a formula from flags, lints it and emits it.
///
/// # Errors
///
/// Returns [`CliError::Failed`] when the rendered formula has lint errors,
/// and other variants for bad input or I/O failures.
pub fn render<O: Write, S: Write>(
    args: &RenderArgs,
    out: &mut O,
    status: &mut S,
) -> Result<(), CliError> {
    let mut builder = DescriptorBuilder::new(&args.name, &args.version, &args.repo)
        .version_test(args.version_test);
    if let Some(desc) = &args.desc {
        builder = builder.desc(desc);
    }
    if let Some(homepage) = &args.homepage {
        builder = builder.homepage(homepage);
    }
    if let Some(license) = &args.license {
        builder = builder.license(license);
    }
    for spec in &args.checksums {
        let (target, sha) = split_assignment(spec, "--sha256")?;
        builder = builder.checksum(target, sha);
    }
    for spec in &args.artifacts {
        let (target, path) = split_assignment(spec, "--artifact")?;
        builder = builder.artifact(target, Path::new(path))?;
    }

    let descriptor = builder.build()?;
    let formula = FormulaGenerator::generate(&descriptor);
    let report = lint_source(&formula)?;

    let origin = args
        .output
        .as_ref()
        .map_or_else(|| "<rendered>".to_string(), |p| p.display().to_string());
    for finding in report.findings() {
        write_finding(status, &origin, finding).map_err(output_error)?;
    }
    if report.has_errors() {
        return Err(CliError::failed(format!(
            "Rendered formula has {} lint error(s); nothing was written",
            report.error_count()
        )));
    }

    match &args.output {
        Some(path) => {
            std::fs::write(path, &formula).map_err(|e| CliError::Runtime {
                message: format!("Failed to write {}: {e}", path.display()),
                help: None,
            })?;
            info!(path = %path.display(), version = %args.version, "Formula written");
            writeln!(status, "✓ Wrote {}", path.display()).map_err(output_error)?;
        }
        None => out.write_all(formula.as_bytes()).map_err(output_error)?,
    }
    Ok(())
}

fn output_error(e: io::Error) -> CliError {
    CliError::runtime(format!("Failed to write output: {e}"))
}
