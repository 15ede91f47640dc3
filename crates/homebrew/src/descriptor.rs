//! Release descriptor model.
//!
//! A descriptor is the data carried by one formula revision: metadata,
//! one download per platform target, and the install and test steps.

use std::collections::BTreeSet;
use std::fmt;

/// Operating system a download is selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    /// `on_macos`
    MacOs,
    /// `on_linux`
    Linux,
    /// Not narrowed by any block
    Any,
}

impl Os {
    /// Returns the identifier used in diagnostics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture a download is selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    /// `on_arm` / `Hardware::CPU.arm?`
    Arm64,
    /// `on_intel` / `Hardware::CPU.intel?`
    X86_64,
    /// Not narrowed by any block
    Any,
}

impl Arch {
    /// Returns the identifier used in diagnostics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An (operating system, architecture) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlatformTarget {
    /// Operating system
    pub os: Os,
    /// CPU architecture
    pub arch: Arch,
}

impl PlatformTarget {
    /// Creates a target.
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Whether a single machine could select both targets.
    ///
    /// `Any` on an axis overlaps every value on that axis.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let os = self.os == other.os || self.os == Os::Any || other.os == Os::Any;
        let arch = self.arch == other.arch || self.arch == Arch::Any || other.arch == Arch::Any;
        os && arch
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// A download declared for one platform target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    /// Which machines select this download
    pub target: PlatformTarget,
    /// Download URL
    pub url: String,
    /// Declared SHA-256, if any
    pub sha256: Option<String>,
    /// 1-based line of the `url` declaration (0 when not parsed from source)
    pub line: usize,
}

/// How the downloaded artifact becomes the installed binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    /// Name of the installed executable
    pub binary: String,
    /// Ruby expression naming the source artifact
    pub source: String,
    /// 1-based line of the `bin.install` call
    pub line: usize,
}

impl InstallStep {
    /// Install the single downloaded `name-*` artifact as `name`.
    #[must_use]
    pub fn canonical(name: &str) -> Self {
        Self {
            binary: name.to_string(),
            source: format!("Dir[\"{name}-*\"].first"),
            line: 0,
        }
    }
}

/// Kind of post-install check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    /// `assert_predicate bin/"x", :exist?`
    Exists,
    /// `shell_output("#{bin}/x --version")`
    VersionFlag,
}

/// The post-install check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestStep {
    /// What the check does
    pub kind: TestKind,
    /// Executable the check references
    pub binary: String,
    /// 1-based line of the assertion
    pub line: usize,
}

impl TestStep {
    /// Creates a test step not tied to a source line.
    #[must_use]
    pub fn new(kind: TestKind, binary: impl Into<String>) -> Self {
        Self {
            kind,
            binary: binary.into(),
            line: 0,
        }
    }
}

/// One revision of a release formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    /// Ruby class name (`BugCrawler`)
    pub class_name: String,
    /// Package name derived from the class name (`bug-crawler`)
    pub name: String,
    /// One-line description
    pub desc: Option<String>,
    /// Project homepage
    pub homepage: Option<String>,
    /// Declared version
    pub version: Option<String>,
    /// License identifier
    pub license: Option<String>,
    /// Downloads in declaration order
    pub targets: Vec<TargetEntry>,
    /// Install step
    pub install: Option<InstallStep>,
    /// Test step
    pub test: Option<TestStep>,
}

impl ReleaseDescriptor {
    /// Creates an empty descriptor for a class.
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Self {
            name: package_name(&class_name),
            class_name,
            desc: None,
            homepage: None,
            version: None,
            license: None,
            targets: Vec::new(),
            install: None,
            test: None,
        }
    }

    /// Target, URL and checksum triples, ignoring declaration order and lines.
    ///
    /// Two revisions with the same version must agree on this.
    #[must_use]
    pub fn content_fingerprint(&self) -> BTreeSet<(PlatformTarget, String, Option<String>)> {
        self.targets
            .iter()
            .map(|t| (t.target, t.url.clone(), t.sha256.clone()))
            .collect()
    }
}

/// Converts a formula class name to its package name.
///
/// `BugCrawler` becomes `bug-crawler`.
#[must_use]
pub fn package_name(class_name: &str) -> String {
    let mut name = String::with_capacity(class_name.len() + 4);
    for (i, ch) in class_name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                name.push('-');
            }
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

/// Converts a package name to its formula class name.
///
/// `bug-crawler` becomes `BugCrawler`.
#[must_use]
pub fn class_name(package_name: &str) -> String {
    package_name
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name_from_class() {
        assert_eq!(package_name("BugCrawler"), "bug-crawler");
        assert_eq!(package_name("Tool"), "tool");
    }

    #[test]
    fn test_class_name_from_package() {
        assert_eq!(class_name("bug-crawler"), "BugCrawler");
        assert_eq!(class_name("tool"), "Tool");
        assert_eq!(package_name(&class_name("bug-crawler")), "bug-crawler");
    }

    #[test]
    fn test_target_overlap() {
        let linux_any = PlatformTarget::new(Os::Linux, Arch::Any);
        let linux_arm = PlatformTarget::new(Os::Linux, Arch::Arm64);
        let linux_intel = PlatformTarget::new(Os::Linux, Arch::X86_64);
        let mac_arm = PlatformTarget::new(Os::MacOs, Arch::Arm64);
        let anywhere = PlatformTarget::new(Os::Any, Arch::Any);

        assert!(linux_any.overlaps(&linux_arm));
        assert!(linux_any.overlaps(&linux_any));
        assert!(!linux_arm.overlaps(&linux_intel));
        assert!(!linux_arm.overlaps(&mac_arm));
        assert!(anywhere.overlaps(&mac_arm));
    }

    #[test]
    fn test_fingerprint_ignores_lines() {
        let mut a = ReleaseDescriptor::new("BugCrawler");
        a.targets.push(TargetEntry {
            target: PlatformTarget::new(Os::Linux, Arch::Any),
            url: "https://example.com/a".to_string(),
            sha256: Some("ab".to_string()),
            line: 3,
        });
        let mut b = a.clone();
        b.targets[0].line = 12;
        assert_eq!(a.content_fingerprint(), b.content_fingerprint());

        b.targets[0].sha256 = Some("cd".to_string());
        assert_ne!(a.content_fingerprint(), b.content_fingerprint());
    }
}
