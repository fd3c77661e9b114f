//! Auto-approve hook: script installation and settings registration.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SetupError;
use crate::output;
use crate::paths::PathResolver;
use crate::settings::{HookEntry, MatcherHook, SettingsStore};
use crate::write_core::{AtomicWriter, WriteOptions};

pub const HOOK_FILENAME: &str = "auto-approve-allowed-commands.sh";
pub const HOOK_MATCHER: &str = "Bash";

/// Installed layout: `<prefix>/bin/claude-code-plus` next to
/// `<prefix>/share/claude-code-plus/`.
const SHARE_DIR: &str = "share/claude-code-plus";

/// The command stored in settings.json. Always the canonical home path, even
/// when the file itself is written into a chezmoi source tree.
pub fn settings_command() -> String {
    format!("$HOME/.claude/hooks/{HOOK_FILENAME}")
}

/// Packaged location first, then the crate's own `assets/` directory.
pub fn asset_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(exe) = env::current_exe() {
        let exe = fs::canonicalize(&exe).unwrap_or(exe);
        if let Some(bin_dir) = exe.parent() {
            candidates.push(bin_dir.join("..").join(SHARE_DIR).join(HOOK_FILENAME));
        }
    }
    candidates.push(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("assets")
            .join(HOOK_FILENAME),
    );
    candidates
}

fn read_first_existing(candidates: &[PathBuf]) -> Result<String> {
    match candidates.iter().find(|c| c.exists()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading hook asset");
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let path = candidates
                .last()
                .cloned()
                .unwrap_or_else(|| PathBuf::from(HOOK_FILENAME));
            Err(SetupError::MissingAsset { path }.into())
        }
    }
}

pub struct HookInstaller<'a> {
    paths: &'a PathResolver,
}

impl<'a> HookInstaller<'a> {
    pub fn new(paths: &'a PathResolver) -> Self {
        Self { paths }
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.paths.config_dir().join("hooks")
    }

    pub fn hook_path(&self) -> PathBuf {
        self.hooks_dir()
            .join(format!("{}{}", self.paths.file_prefix(), HOOK_FILENAME))
    }

    pub fn ensure_hooks_dir(&self) -> Result<()> {
        let dir = self.hooks_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create hooks directory {}", dir.display()))?;
            output::info(&format!("Created {}", output::file(&dir)));
        }
        Ok(())
    }

    pub fn load_hook_asset(&self) -> Result<String> {
        read_first_existing(&asset_candidates())
    }

    pub fn install(&self) -> Result<()> {
        let content = self.load_hook_asset()?;
        self.install_content(&content)
    }

    fn install_content(&self, content: &str) -> Result<()> {
        self.ensure_hooks_dir()?;

        let hook_path = self.hook_path();
        if hook_path.exists() {
            output::info("Hook already exists, updating...");
        }

        AtomicWriter::new(WriteOptions::executable()).write_str(&hook_path, content)?;
        self.paths.track(&hook_path);

        output::success(&format!("Hook installed at {}", output::file(&hook_path)));
        Ok(())
    }

    /// Returns false when the hook was already registered.
    pub fn register_in_settings(&self) -> Result<bool> {
        let store = SettingsStore::new(self.paths);
        let command = settings_command();

        if store.has_hook(&command)? {
            output::info("Hook already configured in settings");
            return Ok(false);
        }

        store.add_hook(&MatcherHook::new(
            HOOK_MATCHER,
            vec![HookEntry::command(command)],
        ))?;
        output::success(&format!(
            "Hook registered in {}",
            output::file(store.path())
        ));
        Ok(true)
    }
}
