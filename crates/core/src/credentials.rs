//! Saved credentials for the supported platforms.
//!
//! Each value lives in its own file under the config directory:
//!
//! | File | Content |
//! |------|---------|
//! | `<platform>_token` | API token for `github`, `bitbucket` or `backlog` |
//! | `token` | legacy GitHub token, migrated on first read |
//! | `bitbucket_email` | Atlassian account email |
//! | `backlog_space` | Backlog space ID |
//! | `backlog_domain` | Backlog domain (`backlog.com` or `backlog.jp`) |

use crate::error::{Error, Result};
use crate::paths;
use crate::platform::PlatformKind;
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable consulted first for GitHub tokens.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

const LEGACY_TOKEN_FILE: &str = "token";
const BITBUCKET_EMAIL_FILE: &str = "bitbucket_email";
const BACKLOG_SPACE_FILE: &str = "backlog_space";
const BACKLOG_DOMAIN_FILE: &str = "backlog_domain";

/// Reads and writes credentials in the config directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    config_dir: PathBuf,
}

impl CredentialStore {
    /// Creates a store rooted at `config_dir`.
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Creates a store at the default config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn with_default_dir() -> Result<Self> {
        Ok(Self::new(paths::config_dir()?))
    }

    /// The directory this store reads from.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Looks up the token for a platform.
    ///
    /// Resolution order:
    /// 1. `GITHUB_TOKEN` (GitHub only)
    /// 2. `<platform>_token` file
    /// 3. legacy `token` file (GitHub only), migrated to `github_token`
    ///
    /// # Errors
    ///
    /// Returns a credentials error if no token is found.
    pub fn token(&self, platform: PlatformKind) -> Result<SecretString> {
        if platform == PlatformKind::GitHub
            && let Ok(token) = std::env::var(GITHUB_TOKEN_ENV)
            && !token.trim().is_empty()
        {
            debug!("Using GitHub token from {GITHUB_TOKEN_ENV}");
            return Ok(SecretString::from(token.trim().to_string()));
        }

        if let Some(token) = self.read_value(&token_file(platform))? {
            return Ok(SecretString::from(token));
        }

        if platform == PlatformKind::GitHub
            && let Some(token) = self.read_value(LEGACY_TOKEN_FILE)?
        {
            info!("Migrating legacy token file to {}", token_file(platform));
            let secret = SecretString::from(token);
            if let Err(e) = self.save_token(platform, &secret) {
                warn!(error = %e, "Could not migrate legacy token file, using it as is");
            }
            return Ok(secret);
        }

        Err(Error::credentials(platform, "token not found"))
    }

    /// Saves the token for a platform.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_token(&self, platform: PlatformKind, token: &SecretString) -> Result<()> {
        self.write_value(&token_file(platform), token.expose_secret())
    }

    /// Saved Atlassian account email for Bitbucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn bitbucket_email(&self) -> Result<Option<String>> {
        self.read_value(BITBUCKET_EMAIL_FILE)
    }

    /// Saves the Atlassian account email for Bitbucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_bitbucket_email(&self, email: &str) -> Result<()> {
        self.write_value(BITBUCKET_EMAIL_FILE, email)
    }

    /// Saved Backlog space ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn backlog_space(&self) -> Result<Option<String>> {
        self.read_value(BACKLOG_SPACE_FILE)
    }

    /// Saves the Backlog space ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_backlog_space(&self, space: &str) -> Result<()> {
        self.write_value(BACKLOG_SPACE_FILE, space)
    }

    /// Saved Backlog domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn backlog_domain(&self) -> Result<Option<String>> {
        self.read_value(BACKLOG_DOMAIN_FILE)
    }

    /// Saves the Backlog domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_backlog_domain(&self, domain: &str) -> Result<()> {
        self.write_value(BACKLOG_DOMAIN_FILE, domain)
    }

    /// Reads a trimmed value; missing or blank files yield `None`.
    fn read_value(&self, file: &str) -> Result<Option<String>> {
        let path = self.config_dir.join(file);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let value = content.trim();
                if value.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(value.to_string()))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(e, path)),
        }
    }

    fn write_value(&self, file: &str, value: &str) -> Result<()> {
        create_private_dir(&self.config_dir)?;
        let path = self.config_dir.join(file);
        std::fs::write(&path, value.trim()).map_err(|e| Error::io(e, &path))?;
        restrict_file(&path)?;
        debug!(path = %path.display(), "Saved credential file");
        Ok(())
    }
}

fn token_file(platform: PlatformKind) -> String {
    format!("{}_token", platform.as_str())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    if dir.exists() {
        let mut perms = std::fs::metadata(dir).map_err(|e| Error::io(e, dir))?.permissions();
        perms.set_mode(0o700);
        return std::fs::set_permissions(dir, perms).map_err(|e| Error::io(e, dir));
    }
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
        .map_err(|e| Error::io(e, dir))
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(e, dir))
}

#[cfg(unix)]
fn restrict_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| Error::io(e, path))?
        .permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms).map_err(|e| Error::io(e, path))
}

#[cfg(not(unix))]
fn restrict_file(_path: &Path) -> Result<()> {
    Ok(())
}
