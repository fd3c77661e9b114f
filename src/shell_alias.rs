//! `claude` wrapper function for bash, zsh and fish.
//!
//! The wrapper pins `SHELL` for the assistant's Bash tool without changing the
//! user's login shell. Existing startup files are appended to, never created
//! or rewritten.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::output;
use crate::paths::PathResolver;

pub const ALIAS_MARKER: &str = "# Added by claude-code-plus for shell alias";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

pub const SHELLS: [Shell; 3] = [Shell::Bash, Shell::Zsh, Shell::Fish];

impl Shell {
    pub fn name(self) -> &'static str {
        match self {
            Shell::Bash => "Bash",
            Shell::Zsh => "Zsh",
            Shell::Fish => "Fish",
        }
    }

    /// Startup files relative to `$HOME`.
    pub fn config_paths(self) -> &'static [&'static str] {
        match self {
            Shell::Bash => &[".bashrc", ".bash_profile"],
            Shell::Zsh => &[".zshrc"],
            Shell::Fish => &[".config/fish/config.fish"],
        }
    }

    pub fn alias_block(self, shell_path: &str) -> String {
        match self {
            Shell::Bash | Shell::Zsh => format!(
                "{ALIAS_MARKER}\nclaude() {{\n  SHELL=\"{shell_path}\" command claude \"$@\"\n}}\n"
            ),
            Shell::Fish => format!(
                "{ALIAS_MARKER}\nfunction claude\n  SHELL=\"{shell_path}\" command claude $argv\nend\n"
            ),
        }
    }

    /// Shell from a binary path such as `/opt/homebrew/bin/fish`.
    pub fn from_binary(shell: &str) -> Option<Self> {
        match Path::new(shell).file_name()?.to_str()? {
            "bash" => Some(Shell::Bash),
            "zsh" => Some(Shell::Zsh),
            "fish" => Some(Shell::Fish),
            _ => None,
        }
    }
}

/// The "reload your shell config" hint for the user's shell. Unknown shells
/// get the bash one.
pub fn source_command(shell: &str) -> &'static str {
    match Shell::from_binary(shell) {
        Some(Shell::Fish) => "source ~/.config/fish/config.fish",
        Some(Shell::Zsh) => "source ~/.zshrc",
        _ => "source ~/.bashrc",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasOutcome {
    Added { shell: Shell, path: PathBuf },
    AlreadyConfigured { shell: Shell, path: PathBuf },
}

pub fn has_alias(content: &str) -> bool {
    content.contains(ALIAS_MARKER)
}

/// Separator that puts the block on its own line after one blank line.
fn separator(content: &str) -> &'static str {
    if content.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    }
}

pub struct ShellAliasConfigurator<'a> {
    paths: &'a PathResolver,
}

impl<'a> ShellAliasConfigurator<'a> {
    pub fn new(paths: &'a PathResolver) -> Self {
        Self { paths }
    }

    /// Add the wrapper to every existing startup file that lacks it. Missing
    /// files are skipped and not reported.
    pub fn configure(&self, shell_path: &str) -> Result<Vec<AliasOutcome>> {
        let mut outcomes = Vec::new();
        for shell in SHELLS {
            for rel in shell.config_paths() {
                let full_path = self.paths.home().join(rel);
                if !full_path.exists() {
                    continue;
                }
                outcomes.push(self.configure_file(shell, &full_path, rel, shell_path)?);
            }
        }
        Ok(outcomes)
    }

    fn configure_file(
        &self,
        shell: Shell,
        full_path: &Path,
        display: &str,
        shell_path: &str,
    ) -> Result<AliasOutcome> {
        let resolved = self.paths.resolve_target(full_path);
        let target = &resolved.target_path;

        let content = read_lossy(target)
            .with_context(|| format!("Failed to read {}", target.display()))?;

        if has_alias(&content) {
            output::info(&format!("{} alias already configured", shell.name()));
            return Ok(AliasOutcome::AlreadyConfigured {
                shell,
                path: full_path.to_path_buf(),
            });
        }

        let block = format!("{}{}", separator(&content), shell.alias_block(shell_path));
        let mut file = OpenOptions::new()
            .append(true)
            .open(target)
            .with_context(|| format!("Failed to open {} for appending", target.display()))?;
        file.write_all(block.as_bytes())
            .with_context(|| format!("Failed to append to {}", target.display()))?;
        tracing::debug!(path = %target.display(), managed = resolved.managed, "appended alias");

        // tracked by the user-facing path; the source file is where bytes go
        if resolved.managed {
            self.paths.track(full_path);
        }

        output::success(&format!("Added claude alias to {}", output::file(display)));
        Ok(AliasOutcome::Added {
            shell,
            path: full_path.to_path_buf(),
        })
    }

    /// Whether the file at `$HOME/<rel>` (or its chezmoi source) carries the
    /// wrapper. `None` when the file does not exist.
    pub fn is_configured(&self, rel: &str) -> Option<bool> {
        let full_path = self.paths.home().join(rel);
        if !full_path.exists() {
            return None;
        }
        let target = self.paths.resolve_target(&full_path).target_path;
        Some(
            read_lossy(&target)
                .map(|content| has_alias(&content))
                .unwrap_or(false),
        )
    }
}

/// Startup files are not guaranteed UTF-8; only the marker needs to match.
fn read_lossy(path: &Path) -> io::Result<String> {
    fs::read(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}
