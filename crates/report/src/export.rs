//! Report files in the output directory.

use crate::csv::{write_bug_csv, write_rules_csv};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use bugcrawler_analyzer::{BugResult, PrRuleResult};
use tracing::{debug, info};

/// File name of the bug report.
pub const BUG_REPORT_FILE: &str = "bug_report.csv";

/// File name of the PR rules report.
pub const RULES_REPORT_FILE: &str = "pr_rules_report.csv";

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer)?;
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Writes `bug_report.csv` into `dir`. Nothing is written when no result is
/// bug-related.
pub fn export_bug_csv(dir: &Path, results: &[BugResult]) -> Result<Option<PathBuf>> {
    if !results.iter().any(|r| r.is_bug_related) {
        debug!("No bug-related PRs, skipping bug report");
        return Ok(None);
    }
    let path = dir.join(BUG_REPORT_FILE);
    let mut rows = 0;
    write_file(&path, |w| {
        rows = write_bug_csv(w, results)?;
        Ok(())
    })?;
    info!(path = %path.display(), rows, "Wrote bug report");
    Ok(Some(path))
}

/// Writes `pr_rules_report.csv` into `dir`, even when `results` is empty.
pub fn export_rules_csv(dir: &Path, results: &[PrRuleResult]) -> Result<PathBuf> {
    let path = dir.join(RULES_REPORT_FILE);
    write_file(&path, |w| write_rules_csv(w, results).map(|_| ()))?;
    info!(path = %path.display(), rows = results.len(), "Wrote PR rules report");
    Ok(path)
}

/// Writes any serializable report as pretty JSON to `path`.
pub fn export_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_file(path, |w| crate::json::write_json(w, value))?;
    info!(path = %path.display(), "Wrote JSON report");
    Ok(())
}
