use anyhow::Result;
use std::env;
use std::path::PathBuf;

use crate::error::SetupError;

/// Redirects the Claude config root; disables chezmoi redirection entirely.
pub const OVERRIDE_VAR: &str = "CLAUDE_DIR_OVERRIDE";

const DEFAULT_SHELL: &str = "/bin/bash";

/// Process configuration, resolved once at startup from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub home: PathBuf,
    pub shell: Option<String>,
    pub claude_dir_override: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir().ok_or(SetupError::HomeNotFound)?;
        Ok(Self::from_parts(
            home,
            env::var("SHELL").ok(),
            env::var_os(OVERRIDE_VAR).map(PathBuf::from),
        ))
    }

    /// Empty `shell`/override values count as unset.
    pub fn from_parts(
        home: impl Into<PathBuf>,
        shell: Option<String>,
        claude_dir_override: Option<PathBuf>,
    ) -> Self {
        Self {
            home: home.into(),
            shell: shell.filter(|s| !s.trim().is_empty()),
            claude_dir_override: claude_dir_override.filter(|p| !p.as_os_str().is_empty()),
        }
    }

    /// `$HOME/.claude`, ignoring override and chezmoi.
    pub fn default_claude_dir(&self) -> PathBuf {
        self.home.join(".claude")
    }

    pub fn shell_or_default(&self) -> &str {
        self.shell.as_deref().unwrap_or(DEFAULT_SHELL)
    }
}
