//! Building descriptors for GitHub release assets.

use crate::checksum::sha256_file;
use crate::descriptor::{
    Arch, InstallStep, Os, PlatformTarget, ReleaseDescriptor, TargetEntry, TestKind, TestStep,
    class_name,
};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Prebuilt binary targets published with each release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReleaseTarget {
    /// macOS Apple Silicon
    DarwinArm64,
    /// macOS Intel
    DarwinAmd64,
    /// Linux ARM64
    LinuxArm64,
    /// Linux `x86_64`
    LinuxAmd64,
}

impl ReleaseTarget {
    /// OS token used in asset names.
    #[must_use]
    pub const fn os_token(&self) -> &'static str {
        match self {
            Self::DarwinArm64 | Self::DarwinAmd64 => "darwin",
            Self::LinuxArm64 | Self::LinuxAmd64 => "linux",
        }
    }

    /// Architecture token used in asset names.
    #[must_use]
    pub const fn arch_token(&self) -> &'static str {
        match self {
            Self::DarwinArm64 | Self::LinuxArm64 => "arm64",
            Self::DarwinAmd64 | Self::LinuxAmd64 => "amd64",
        }
    }

    /// Returns the short identifier (e.g., "darwin-arm64").
    #[must_use]
    pub const fn short_id(&self) -> &'static str {
        match self {
            Self::DarwinArm64 => "darwin-arm64",
            Self::DarwinAmd64 => "darwin-amd64",
            Self::LinuxArm64 => "linux-arm64",
            Self::LinuxAmd64 => "linux-amd64",
        }
    }

    /// The platform target the formula selects this asset for.
    #[must_use]
    pub const fn platform_target(&self) -> PlatformTarget {
        let os = match self {
            Self::DarwinArm64 | Self::DarwinAmd64 => Os::MacOs,
            Self::LinuxArm64 | Self::LinuxAmd64 => Os::Linux,
        };
        let arch = match self {
            Self::DarwinArm64 | Self::LinuxArm64 => Arch::Arm64,
            Self::DarwinAmd64 | Self::LinuxAmd64 => Arch::X86_64,
        };
        PlatformTarget::new(os, arch)
    }

    /// Returns all supported targets.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DarwinArm64,
            Self::DarwinAmd64,
            Self::LinuxArm64,
            Self::LinuxAmd64,
        ]
    }
}

impl fmt::Display for ReleaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_id())
    }
}

impl FromStr for ReleaseTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .find(|t| t.short_id() == s)
            .copied()
            .ok_or_else(|| Error::invalid_target(s))
    }
}

/// Builds a [`ReleaseDescriptor`] for assets attached to a GitHub release.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    version: String,
    repository: String,
    desc: Option<String>,
    homepage: Option<String>,
    license: Option<String>,
    version_test: bool,
    checksums: BTreeMap<ReleaseTarget, String>,
}

impl DescriptorBuilder {
    /// Creates a builder.
    ///
    /// # Arguments
    /// * `name` - Package and binary name (e.g., "bug-crawler")
    /// * `version` - Version without the `v` prefix (e.g., "1.0.6")
    /// * `repository` - GitHub repository hosting the release, as `owner/repo`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            repository: repository.into(),
            desc: None,
            homepage: None,
            license: None,
            version_test: false,
            checksums: BTreeMap::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// Sets the homepage; defaults to the repository page.
    #[must_use]
    pub fn homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }

    /// Sets the license.
    #[must_use]
    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    /// Use a `--version` check instead of an existence check.
    #[must_use]
    pub const fn version_test(mut self, enabled: bool) -> Self {
        self.version_test = enabled;
        self
    }

    /// Adds a target with a known checksum.
    #[must_use]
    pub fn checksum(mut self, target: ReleaseTarget, sha256: impl Into<String>) -> Self {
        self.checksums.insert(target, sha256.into());
        self
    }

    /// Adds a target, hashing the local artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be read.
    pub fn artifact(self, target: ReleaseTarget, path: &Path) -> Result<Self> {
        let sha = sha256_file(path)?;
        Ok(self.checksum(target, sha))
    }

    /// Download URL for one target.
    #[must_use]
    pub fn asset_url(&self, target: ReleaseTarget) -> String {
        format!(
            "https://github.com/{}/releases/download/v{}/{}-{}-{}",
            self.repository,
            self.version,
            self.name,
            target.os_token(),
            target.arch_token()
        )
    }

    /// Builds the descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the repository is not `owner/repo`.
    pub fn build(self) -> Result<ReleaseDescriptor> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_descriptor("package name must not be empty"));
        }
        match self.repository.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {}
            _ => {
                return Err(Error::invalid_descriptor(format!(
                    "repository `{}` must be of the form owner/repo",
                    self.repository
                )));
            }
        }

        let mut descriptor = ReleaseDescriptor::new(class_name(&self.name));
        descriptor.name.clone_from(&self.name);
        descriptor.desc.clone_from(&self.desc);
        descriptor.homepage = Some(
            self.homepage
                .clone()
                .unwrap_or_else(|| format!("https://github.com/{}", self.repository)),
        );
        descriptor.version = Some(self.version.clone());
        descriptor.license.clone_from(&self.license);
        descriptor.targets = self
            .checksums
            .iter()
            .map(|(target, sha)| TargetEntry {
                target: target.platform_target(),
                url: self.asset_url(*target),
                sha256: Some(sha.clone()),
                line: 0,
            })
            .collect();
        descriptor.install = Some(InstallStep::canonical(&self.name));
        let kind = if self.version_test {
            TestKind::VersionFlag
        } else {
            TestKind::Exists
        };
        descriptor.test = Some(TestStep::new(kind, self.name.clone()));

        Ok(descriptor)
    }
}
