//! Line-oriented parser for the formula dialect used by release descriptors.
//!
//! The parser understands the subset of Ruby that release formulas use and
//! never evaluates anything. Structural defects are collected as
//! [`StructureIssue`]s instead of aborting, so the linter can report every
//! problem in one pass.

use crate::descriptor::{
    Arch, InstallStep, Os, PlatformTarget, ReleaseDescriptor, TargetEntry, TestKind, TestStep,
};
use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::trace;

/// A structural defect found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureIssue {
    /// 1-based line number
    pub line: usize,
    /// Human readable description
    pub message: String,
}

/// A parsed formula: the descriptor plus everything the linter needs.
#[derive(Debug, Clone)]
pub struct ParsedFormula {
    /// The extracted descriptor
    pub descriptor: ReleaseDescriptor,
    /// Structural defects in source order
    pub issues: Vec<StructureIssue>,
    /// 1-based line of each metadata field (`desc`, `homepage`, ...)
    pub field_lines: HashMap<&'static str, usize>,
    /// 1-based line of the class header
    pub class_line: usize,
    /// The original source
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Class,
    OnOs(Os),
    OnArch(Arch),
    /// `if Hardware::CPU.*?`; `None` for any other condition
    If(Option<Arch>),
    Install,
    Test,
    Other,
}

struct PendingUrl {
    url: String,
    target: PlatformTarget,
    line: usize,
    depth: usize,
}

struct PendingSha {
    sha256: String,
    line: usize,
    depth: usize,
}

struct Parser {
    stack: Vec<(Block, usize)>,
    descriptor: ReleaseDescriptor,
    issues: Vec<StructureIssue>,
    field_lines: HashMap<&'static str, usize>,
    pending_url: Option<PendingUrl>,
    pending_sha: Option<PendingSha>,
    class_closed_at: Option<usize>,
}

/// Parses formula source into a descriptor and its structural issues.
///
/// # Errors
///
/// Returns an error only if the source has no `class X < Formula` header.
pub fn parse_formula(source: &str) -> Result<ParsedFormula> {
    let (class_line, class_name) = source
        .lines()
        .enumerate()
        .find_map(|(i, line)| class_header(line.trim()).map(|name| (i + 1, name)))
        .ok_or_else(|| Error::parse("no `class ... < Formula` declaration found"))?;

    let mut parser = Parser {
        stack: Vec::new(),
        descriptor: ReleaseDescriptor::new(class_name),
        issues: Vec::new(),
        field_lines: HashMap::new(),
        pending_url: None,
        pending_sha: None,
        class_closed_at: None,
    };

    for (i, raw) in source.lines().enumerate().skip(class_line - 1) {
        parser.line(i + 1, strip_comment(raw).trim());
    }
    parser.finish();

    trace!(
        class = %parser.descriptor.class_name,
        targets = parser.descriptor.targets.len(),
        issues = parser.issues.len(),
        "Parsed formula"
    );

    Ok(ParsedFormula {
        descriptor: parser.descriptor,
        issues: parser.issues,
        field_lines: parser.field_lines,
        class_line,
        source: source.to_string(),
    })
}

impl Parser {
    fn line(&mut self, number: usize, line: &str) {
        if line.is_empty() || line.starts_with('#') {
            return;
        }

        if let Some(closed) = self.class_closed_at {
            self.issue(
                number,
                format!("unexpected `{line}` after the formula class closed on line {closed}"),
            );
            return;
        }

        if line == "}" || line == "{" {
            self.issue(number, format!("stray `{line}`"));
            return;
        }

        if line == "end" {
            self.close_block(number);
            return;
        }

        if self.stack.is_empty() {
            if class_header(line).is_some() {
                self.stack.push((Block::Class, number));
            } else {
                self.issue(number, format!("unexpected `{line}` outside the formula class"));
            }
            return;
        }

        if let Some(block) = opening_block(line) {
            self.stack.push((block, number));
            return;
        }

        if let Some(rest) = line.strip_prefix("elsif ") {
            self.switch_branch(number, hardware_arch(rest));
            return;
        }
        if line == "else" {
            let flipped = match self.top() {
                Some(Block::If(Some(Arch::Arm64))) => Some(Arch::X86_64),
                Some(Block::If(Some(Arch::X86_64))) => Some(Arch::Arm64),
                _ => None,
            };
            self.switch_branch(number, flipped);
            return;
        }

        self.statement(number, line);
    }

    fn statement(&mut self, number: usize, line: &str) {
        for field in ["desc", "homepage", "version", "license"] {
            if let Some(rest) = keyword(line, field) {
                let value = quoted(rest).unwrap_or_else(|| rest.trim().to_string());
                self.set_field(field, value, number);
                return;
            }
        }

        if let Some(rest) = keyword(line, "url") {
            match quoted(rest) {
                Some(url) => self.url(number, url),
                None => self.issue(number, "`url` without a quoted string"),
            }
            return;
        }

        if let Some(rest) = keyword(line, "sha256") {
            match quoted(rest) {
                Some(sha) => self.sha256(number, sha),
                None => self.issue(number, "`sha256` without a quoted string"),
            }
            return;
        }

        match self.top() {
            Some(Block::Install) => {
                if let Some(step) = install_step(line, number) {
                    self.descriptor.install = Some(step);
                }
            }
            Some(Block::Test) => {
                if let Some(step) = test_step(line, number) {
                    self.descriptor.test = Some(step);
                }
            }
            _ => {}
        }
    }

    fn set_field(&mut self, field: &'static str, value: String, line: usize) {
        self.field_lines.entry(field).or_insert(line);
        let slot = match field {
            "desc" => &mut self.descriptor.desc,
            "homepage" => &mut self.descriptor.homepage,
            "version" => &mut self.descriptor.version,
            _ => &mut self.descriptor.license,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn url(&mut self, number: usize, url: String) {
        let depth = self.stack.len();
        let target = self.current_target();

        if let Some(sha) = self.pending_sha.take() {
            if sha.depth == depth {
                self.descriptor.targets.push(TargetEntry {
                    target,
                    url,
                    sha256: Some(sha.sha256),
                    line: number,
                });
                return;
            }
            self.orphan_sha(sha.line);
        }

        self.flush_url();
        self.pending_url = Some(PendingUrl {
            url,
            target,
            line: number,
            depth,
        });
    }

    fn sha256(&mut self, number: usize, sha256: String) {
        let depth = self.stack.len();
        if let Some(pending) = self.pending_url.take() {
            if pending.depth == depth {
                self.descriptor.targets.push(TargetEntry {
                    target: pending.target,
                    url: pending.url,
                    sha256: Some(sha256),
                    line: pending.line,
                });
                return;
            }
            self.pending_url = Some(pending);
            self.flush_url();
        }

        if let Some(previous) = self.pending_sha.take() {
            self.orphan_sha(previous.line);
        }
        self.pending_sha = Some(PendingSha {
            sha256,
            line: number,
            depth,
        });
    }

    /// Records a `url` that never got a `sha256`.
    fn flush_url(&mut self) {
        if let Some(pending) = self.pending_url.take() {
            self.issue(pending.line, "`url` without a matching `sha256`");
            self.descriptor.targets.push(TargetEntry {
                target: pending.target,
                url: pending.url,
                sha256: None,
                line: pending.line,
            });
        }
    }

    fn orphan_sha(&mut self, line: usize) {
        self.issue(line, "`sha256` without a matching `url`");
    }

    fn flush_pending(&mut self) {
        self.flush_url();
        if let Some(sha) = self.pending_sha.take() {
            self.orphan_sha(sha.line);
        }
    }

    fn switch_branch(&mut self, number: usize, arch: Option<Arch>) {
        match self.stack.last_mut() {
            Some((Block::If(current), _)) => {
                *current = arch;
            }
            _ => {
                self.issue(number, "`else`/`elsif` outside an `if` block");
                return;
            }
        }
        self.flush_pending();
    }

    fn close_block(&mut self, number: usize) {
        self.flush_pending();
        match self.stack.pop() {
            Some((Block::Class, _)) => {
                self.class_closed_at = Some(number);
                if !self.stack.is_empty() {
                    self.issue(number, "class closed inside another block");
                }
            }
            Some(_) => {}
            None => self.issue(number, "unbalanced `end`"),
        }
    }

    fn finish(&mut self) {
        self.flush_pending();
        while let Some((block, line)) = self.stack.pop() {
            let what = if block == Block::Class {
                "formula class"
            } else {
                "block"
            };
            self.issue(line, format!("{what} opened here is never closed with `end`"));
        }
        self.issues.sort_by_key(|issue| issue.line);
    }

    fn current_target(&self) -> PlatformTarget {
        let mut os = Os::Any;
        let mut arch = Arch::Any;
        for (block, _) in &self.stack {
            match block {
                Block::OnOs(o) => os = *o,
                Block::OnArch(a) | Block::If(Some(a)) => arch = *a,
                _ => {}
            }
        }
        PlatformTarget::new(os, arch)
    }

    fn top(&self) -> Option<Block> {
        self.stack.last().map(|(block, _)| *block)
    }

    fn issue(&mut self, line: usize, message: impl Into<String>) {
        self.issues.push(StructureIssue {
            line,
            message: message.into(),
        });
    }
}

/// Cuts a trailing `# comment`. A `#` inside a string literal, such as
/// `"#{bin}/x"`, is kept.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some(_), '\\') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '#') => return &line[..i],
            (None, _) => {}
        }
    }
    line
}

/// Matches `class Name < Formula` and returns `Name`.
fn class_header(line: &str) -> Option<String> {
    let rest = line.strip_prefix("class ")?;
    let (name, parent) = rest.split_once('<')?;
    let name = name.trim();
    let is_formula = parent.trim().split_whitespace().next() == Some("Formula");
    (is_formula && !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        .then(|| name.to_string())
}

fn opening_block(line: &str) -> Option<Block> {
    let block = match line {
        "on_macos do" => Block::OnOs(Os::MacOs),
        "on_linux do" => Block::OnOs(Os::Linux),
        "on_arm do" => Block::OnArch(Arch::Arm64),
        "on_intel do" => Block::OnArch(Arch::X86_64),
        "def install" => Block::Install,
        "test do" => Block::Test,
        _ => {
            if let Some(condition) = line.strip_prefix("if ").or_else(|| line.strip_prefix("unless ")) {
                let arch = if line.starts_with("if ") {
                    hardware_arch(condition)
                } else {
                    None
                };
                Block::If(arch)
            } else if line.starts_with("def ")
                || line.starts_with("class ")
                || line.starts_with("module ")
                || line.starts_with("case ")
                || line == "begin"
                || line.ends_with(" do")
                || (line.contains(" do |") && line.ends_with('|'))
            {
                Block::Other
            } else {
                return None;
            }
        }
    };
    Some(block)
}

fn hardware_arch(condition: &str) -> Option<Arch> {
    match condition.trim() {
        "Hardware::CPU.arm?" => Some(Arch::Arm64),
        "Hardware::CPU.intel?" => Some(Arch::X86_64),
        _ => None,
    }
}

/// Returns the remainder of `line` when it starts with the bare word `word`.
fn keyword<'a>(line: &'a str, word: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(word)?;
    rest.starts_with(char::is_whitespace).then_some(rest)
}

/// Extracts the first double-quoted string literal at the start of `text`.
fn quoted(text: &str) -> Option<String> {
    let body = text.trim_start().strip_prefix('"')?;
    let mut value = String::new();
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => value.push(chars.next()?),
            '"' => return Some(value),
            _ => value.push(ch),
        }
    }
    None
}

/// Parses `bin.install SRC => "name"` or `bin.install "name"`.
fn install_step(line: &str, number: usize) -> Option<InstallStep> {
    let args = line.strip_prefix("bin.install")?.trim();
    if let Some((source, target)) = args.rsplit_once("=>") {
        return Some(InstallStep {
            binary: quoted(target)?,
            source: source.trim().to_string(),
            line: number,
        });
    }
    let binary = quoted(args)?;
    Some(InstallStep {
        source: format!("\"{binary}\""),
        binary,
        line: number,
    })
}

/// Recognizes the existence and version-flag assertions.
fn test_step(line: &str, number: usize) -> Option<TestStep> {
    if let Some(args) = keyword(line, "assert_predicate") {
        let path = args.trim().strip_prefix("bin/")?;
        return Some(TestStep {
            kind: TestKind::Exists,
            binary: quoted(path)?,
            line: number,
        });
    }

    let marker = "#{bin}/";
    let start = line.find(marker)? + marker.len();
    let binary: String = line[start..]
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '"')
        .collect();
    if binary.is_empty() {
        return None;
    }
    let kind = if line.contains("--version") {
        TestKind::VersionFlag
    } else {
        TestKind::Exists
    };
    Some(TestStep {
        kind,
        binary,
        line: number,
    })
}
