//! Path management for bug-crawler configuration.
//!
//! | Platform | Config Dir |
//! |----------|------------|
//! | **macOS** | `~/Library/Application Support/bug-crawler` |
//! | **Linux** | `~/.config/bug-crawler` (XDG_CONFIG_HOME) |
//! | **Windows** | `%APPDATA%\bug-crawler` |
//!
//! `BUG_CRAWLER_CONFIG_DIR` overrides the location for testing and CI.

use crate::{Error, Result};
use std::path::PathBuf;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "BUG_CRAWLER_CONFIG_DIR";

/// Directory name under the platform config directory.
pub const APP_DIR_NAME: &str = "bug-crawler";

/// Get the configuration directory holding saved credentials.
///
/// Resolution order:
/// 1. `BUG_CRAWLER_CONFIG_DIR` environment variable
/// 2. Platform config directory + `/bug-crawler`
/// 3. `~/.config/bug-crawler`
///
/// # Errors
///
/// Returns an error if neither a config nor a home directory can be determined.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    if let Some(base) = dirs::config_dir() {
        return Ok(base.join(APP_DIR_NAME));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| Error::configuration("Could not determine config directory"))?;
    Ok(home.join(".config").join(APP_DIR_NAME))
}
