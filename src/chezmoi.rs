//! Dotfile manager integration (chezmoi).

use std::path::{Path, PathBuf};

use crate::exec::{command_exists, shell_quote, CommandRunner, ExecOptions, ShellRunner};

/// The slice of a dotfile manager this tool needs: map target <-> source and
/// apply a single target. Unavailability must look like "not managed".
pub trait DotfileManager {
    fn is_available(&self) -> bool;

    /// Source-tree counterpart of `target`, if the manager tracks it.
    fn source_path(&self, target: &Path) -> Option<PathBuf>;

    /// Target path of a source-tree file.
    fn target_path(&self, source: &Path) -> Option<PathBuf>;

    /// Sync `target` from the source tree. Runs attached to the terminal so
    /// the manager can prompt.
    fn apply(&self, target: &Path) -> bool;
}

pub struct Chezmoi<R: CommandRunner = ShellRunner> {
    runner: R,
}

impl Chezmoi<ShellRunner> {
    pub fn new() -> Self {
        Self::with_runner(ShellRunner)
    }
}

impl Default for Chezmoi<ShellRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> Chezmoi<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    fn query_path(&self, subcommand: &str, path: &Path) -> Option<PathBuf> {
        let command = format!(
            "chezmoi {} {} 2>/dev/null",
            subcommand,
            shell_quote(&path.to_string_lossy())
        );
        let result = self.runner.capture(&command);
        if result.success && !result.stdout.is_empty() {
            Some(PathBuf::from(result.stdout))
        } else {
            None
        }
    }
}

impl<R: CommandRunner> DotfileManager for Chezmoi<R> {
    fn is_available(&self) -> bool {
        command_exists(&self.runner, "chezmoi")
    }

    fn source_path(&self, target: &Path) -> Option<PathBuf> {
        let source = self.query_path("source-path", target);
        tracing::debug!(target = %target.display(), ?source, "chezmoi source-path");
        source
    }

    fn target_path(&self, source: &Path) -> Option<PathBuf> {
        let target = self.query_path("target-path", source);
        tracing::debug!(source = %source.display(), ?target, "chezmoi target-path");
        target
    }

    fn apply(&self, target: &Path) -> bool {
        let command = format!("chezmoi apply {}", shell_quote(&target.to_string_lossy()));
        self.runner.run(&command, ExecOptions::inherit()).success
    }
}
