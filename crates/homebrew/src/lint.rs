//! Well-formedness rules for published release descriptors.

use crate::descriptor::ReleaseDescriptor;
use crate::error::Result;
use crate::parser::{ParsedFormula, parse_formula};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

#[allow(clippy::expect_used)]
static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // `{{ anything }}` or a bare `{identifier}` not preceded by `#`
    Regex::new(r"\{\{[^}]*\}\}|(?:^|[^#{])(\{[A-Za-z_][A-Za-z0-9_]*\})").expect("literal pattern")
});

#[allow(clippy::expect_used)]
static URL_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/v(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)/").expect("literal pattern")
});

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Fails only with `--deny-warnings`
    Warning,
    /// Always fails
    Error,
}

impl Severity {
    /// Returns the lowercase label used in output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifiers for each rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LintCode {
    /// Checksum is not a 64-character lowercase hex digest
    InvalidChecksum,
    /// Two downloads can be selected by the same machine
    DuplicateTarget,
    /// Parser structural issue
    MalformedStructure,
    /// Placeholder token left in the file
    UnresolvedTemplate,
    /// Install or test step uses the wrong executable name
    BinaryNameMismatch,
    /// Required field absent
    MissingField,
    /// Version is not semver
    InvalidVersion,
    /// No downloads declared
    NoTargets,
    /// Release tag in a URL differs from the declared version
    UrlVersionMismatch,
    /// Download over plain http
    InsecureUrl,
}

impl LintCode {
    /// Returns the kebab-case code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidChecksum => "invalid-checksum",
            Self::DuplicateTarget => "duplicate-target",
            Self::MalformedStructure => "malformed-structure",
            Self::UnresolvedTemplate => "unresolved-template",
            Self::BinaryNameMismatch => "binary-name-mismatch",
            Self::MissingField => "missing-field",
            Self::InvalidVersion => "invalid-version",
            Self::NoTargets => "no-targets",
            Self::UrlVersionMismatch => "url-version-mismatch",
            Self::InsecureUrl => "insecure-url",
        }
    }

    /// Default severity of the rule.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::UrlVersionMismatch | Self::InsecureUrl => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for LintCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Rule that fired
    pub code: LintCode,
    /// Severity
    pub severity: Severity,
    /// 1-based line, when the finding is tied to one
    pub line: Option<usize>,
    /// Human readable description
    pub message: String,
}

impl Finding {
    fn new(code: LintCode, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            line,
            message: message.into(),
        }
    }
}

/// All findings for one formula.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    findings: Vec<Finding>,
}

impl LintReport {
    /// Findings ordered by line.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Whether any finding is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Whether any finding is a warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Warning)
    }

    /// Number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    /// Number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.findings.len() - self.error_count()
    }

    /// Whether the formula should be rejected.
    #[must_use]
    pub fn fails(&self, deny_warnings: bool) -> bool {
        self.has_errors() || (deny_warnings && self.has_warnings())
    }

    /// Whether a rule fired at least once.
    #[must_use]
    pub fn contains(&self, code: LintCode) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }

    /// Whether there are no findings at all.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Parses and lints formula source.
///
/// # Errors
///
/// Returns an error if the source has no formula class.
pub fn lint_source(source: &str) -> Result<LintReport> {
    Ok(lint(&parse_formula(source)?))
}

/// Runs every rule against a parsed formula.
#[must_use]
pub fn lint(parsed: &ParsedFormula) -> LintReport {
    let d = &parsed.descriptor;
    let mut findings = Vec::new();

    for issue in &parsed.issues {
        findings.push(Finding::new(
            LintCode::MalformedStructure,
            Some(issue.line),
            issue.message.clone(),
        ));
    }

    check_fields(parsed, &mut findings);
    check_targets(d, &mut findings);
    check_binary_names(d, parsed.class_line, &mut findings);
    check_templates(&parsed.source, &mut findings);

    findings.sort_by(|a, b| a.line.cmp(&b.line).then(a.code.cmp(&b.code)));
    LintReport { findings }
}

fn check_fields(parsed: &ParsedFormula, findings: &mut Vec<Finding>) {
    let d = &parsed.descriptor;
    let fields = [
        ("desc", &d.desc),
        ("homepage", &d.homepage),
        ("version", &d.version),
        ("license", &d.license),
    ];
    for (name, value) in fields {
        if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
            findings.push(Finding::new(
                LintCode::MissingField,
                Some(parsed.class_line),
                format!("required field `{name}` is missing"),
            ));
        }
    }
    if d.install.is_none() {
        findings.push(Finding::new(
            LintCode::MissingField,
            Some(parsed.class_line),
            "no `bin.install` step found in `def install`",
        ));
    }
    if d.test.is_none() {
        findings.push(Finding::new(
            LintCode::MissingField,
            Some(parsed.class_line),
            "no recognizable assertion found in `test do`",
        ));
    }

    if let Some(version) = d.version.as_deref()
        && !version.trim().is_empty()
        && semver::Version::parse(version).is_err()
    {
        findings.push(Finding::new(
            LintCode::InvalidVersion,
            parsed.field_lines.get("version").copied(),
            format!("version `{version}` is not a semantic version"),
        ));
    }
}

fn check_targets(d: &ReleaseDescriptor, findings: &mut Vec<Finding>) {
    if d.targets.is_empty() {
        findings.push(Finding::new(
            LintCode::NoTargets,
            None,
            "no download `url` declared",
        ));
        return;
    }

    let declared = d.version.as_deref().and_then(|v| semver::Version::parse(v).ok());

    for (i, entry) in d.targets.iter().enumerate() {
        let line = Some(entry.line);

        if let Some(sha) = entry.sha256.as_deref()
            && let Some(problem) = checksum_problem(sha)
        {
            findings.push(Finding::new(
                LintCode::InvalidChecksum,
                line,
                format!("sha256 for {} {problem}", entry.target),
            ));
        }

        if let Some(first) = d.targets[..i].iter().find(|e| e.target.overlaps(&entry.target)) {
            findings.push(Finding::new(
                LintCode::DuplicateTarget,
                line,
                format!(
                    "download for {} overlaps {} declared on line {}",
                    entry.target, first.target, first.line
                ),
            ));
        }

        if !entry.url.starts_with("https://") {
            findings.push(Finding::new(
                LintCode::InsecureUrl,
                line,
                format!("download URL `{}` does not use https", entry.url),
            ));
        }

        if let Some(declared) = &declared
            && let Some(caps) = URL_TAG_RE.captures(&entry.url)
            && let Ok(tagged) = semver::Version::parse(&caps[1])
            && &tagged != declared
        {
            findings.push(Finding::new(
                LintCode::UrlVersionMismatch,
                line,
                format!("URL points at release v{tagged} but version is {declared}"),
            ));
        }
    }
}

/// Describes what is wrong with a checksum, if anything.
fn checksum_problem(sha: &str) -> Option<String> {
    let len = sha.chars().count();
    if len != SHA256_HEX_LEN {
        return Some(format!(
            "has {len} characters, expected {SHA256_HEX_LEN} hexadecimal digits"
        ));
    }
    if !sha.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
        return Some("is not lowercase hexadecimal".to_string());
    }
    None
}

/// Whether `sha` is a well-formed SHA-256 hex digest.
#[must_use]
pub fn is_valid_sha256(sha: &str) -> bool {
    checksum_problem(sha).is_none()
}

fn check_binary_names(d: &ReleaseDescriptor, class_line: usize, findings: &mut Vec<Finding>) {
    if let Some(install) = &d.install
        && install.binary != d.name
    {
        findings.push(Finding::new(
            LintCode::BinaryNameMismatch,
            Some(install.line).filter(|l| *l > 0).or(Some(class_line)),
            format!(
                "install step installs `{}` but the package is `{}`",
                install.binary, d.name
            ),
        ));
    }
    if let Some(test) = &d.test
        && test.binary != d.name
    {
        findings.push(Finding::new(
            LintCode::BinaryNameMismatch,
            Some(test.line).filter(|l| *l > 0).or(Some(class_line)),
            format!(
                "test step checks `{}` but the package is `{}`",
                test.binary, d.name
            ),
        ));
    }
}

fn check_templates(source: &str, findings: &mut Vec<Finding>) {
    for (i, line) in source.lines().enumerate() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = TEMPLATE_RE
            .captures_iter(line)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| m.as_str())
            .collect();
        if !tokens.is_empty() {
            findings.push(Finding::new(
                LintCode::UnresolvedTemplate,
                Some(i + 1),
                format!("unresolved template token {}", tokens.join(", ")),
            ));
        }
    }
}
