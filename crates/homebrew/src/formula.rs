//! Homebrew formula generation.
//!
//! Renders a [`ReleaseDescriptor`] as a Ruby formula in the canonical layout.

use crate::descriptor::{Arch, InstallStep, Os, ReleaseDescriptor, TargetEntry, TestKind};

/// Homebrew formula generator.
pub struct FormulaGenerator;

impl FormulaGenerator {
    /// Generates a Ruby formula from the descriptor.
    #[must_use]
    #[allow(clippy::format_push_string)]
    pub fn generate(descriptor: &ReleaseDescriptor) -> String {
        let mut formula = format!("class {} < Formula\n", descriptor.class_name);
        for (field, value) in [
            ("desc", &descriptor.desc),
            ("homepage", &descriptor.homepage),
            ("version", &descriptor.version),
            ("license", &descriptor.license),
        ] {
            if let Some(value) = value {
                formula.push_str(&format!("  {field} \"{}\"\n", escape(value)));
            }
        }

        for entry in descriptor.targets.iter().filter(|t| t.target.os == Os::Any) {
            formula.push('\n');
            push_download(&mut formula, entry, 1);
        }

        for (os, block) in [(Os::MacOs, "on_macos"), (Os::Linux, "on_linux")] {
            let entries: Vec<&TargetEntry> = descriptor
                .targets
                .iter()
                .filter(|t| t.target.os == os)
                .collect();
            if entries.is_empty() {
                continue;
            }

            formula.push_str(&format!("\n  {block} do\n"));
            for entry in &entries {
                match entry.target.arch {
                    Arch::Arm64 | Arch::X86_64 => {
                        let arch_block = if entry.target.arch == Arch::Arm64 {
                            "on_arm"
                        } else {
                            "on_intel"
                        };
                        formula.push_str(&format!("    {arch_block} do\n"));
                        push_download(&mut formula, entry, 3);
                        formula.push_str("    end\n");
                    }
                    Arch::Any => push_download(&mut formula, entry, 2),
                }
            }
            formula.push_str("  end\n");
        }

        // Install and test sections
        let install = descriptor
            .install
            .clone()
            .unwrap_or_else(|| InstallStep::canonical(&descriptor.name));
        formula.push_str("\n  def install\n");
        if install.source == format!("\"{}\"", install.binary) {
            formula.push_str(&format!("    bin.install \"{}\"\n", install.binary));
        } else {
            formula.push_str(&format!(
                "    bin.install {} => \"{}\"\n",
                install.source, install.binary
            ));
        }
        formula.push_str("  end\n\n");

        let (kind, binary) = descriptor.test.as_ref().map_or(
            (TestKind::Exists, descriptor.name.as_str()),
            |t| (t.kind, t.binary.as_str()),
        );
        formula.push_str("  test do\n");
        match kind {
            TestKind::Exists => {
                formula.push_str(&format!("    assert_predicate bin/\"{binary}\", :exist?\n"));
            }
            TestKind::VersionFlag => {
                // Ruby string interpolation: #{bin} - we need literal #{ in the output
                formula.push_str(&format!(
                    "    assert_match version.to_s, shell_output(\"#{{bin}}/{binary} --version\")\n"
                ));
            }
        }
        formula.push_str("  end\nend\n");

        formula
    }
}

#[allow(clippy::format_push_string)]
fn push_download(formula: &mut String, entry: &TargetEntry, depth: usize) {
    let indent = "  ".repeat(depth);
    formula.push_str(&format!("{indent}url \"{}\"\n", escape(&entry.url)));
    if let Some(sha) = &entry.sha256 {
        formula.push_str(&format!("{indent}sha256 \"{sha}\"\n"));
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
