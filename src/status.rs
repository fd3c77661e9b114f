use anyhow::Result;

use crate::exec::{command_version, CommandRunner};
use crate::hooks::{settings_command, HookInstaller};
use crate::paths::PathResolver;
use crate::settings::SettingsStore;
use crate::shell_alias::{ShellAliasConfigurator, SHELLS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub config_dir: String,
    pub location: &'static str,
    pub settings_exists: bool,
    pub allowed_count: usize,
    pub hook_registered: bool,
    pub hook_installed: bool,
    /// (file relative to home, None = missing / Some(configured))
    pub aliases: Vec<(&'static str, Option<bool>)>,
    pub claude_version: Option<String>,
    pub chezmoi_version: Option<String>,
}

/// Gather configuration state without mutating anything.
pub fn collect(paths: &PathResolver, runner: &dyn CommandRunner) -> Result<Status> {
    let store = SettingsStore::new(paths);
    let settings = store.load()?;
    let installer = HookInstaller::new(paths);
    let aliases = ShellAliasConfigurator::new(paths);

    let location = if paths.is_override_active() {
        "override"
    } else if paths.is_managed() {
        "chezmoi source"
    } else {
        "home"
    };

    Ok(Status {
        config_dir: paths.config_dir().display().to_string(),
        location,
        settings_exists: store.exists(),
        allowed_count: settings.allowed().len(),
        hook_registered: settings.has_hook(&settings_command()),
        hook_installed: installer.hook_path().exists(),
        aliases: SHELLS
            .iter()
            .flat_map(|shell| shell.config_paths().iter())
            .map(|rel| (*rel, aliases.is_configured(rel)))
            .collect(),
        claude_version: command_version(runner, "claude", "--version"),
        chezmoi_version: command_version(runner, "chezmoi", "--version"),
    })
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "⚪"
    }
}

pub fn render(status: &Status) -> String {
    let mut out = String::new();
    out.push_str("📋 claude-code-plus status:\n\n");
    out.push_str(&format!(
        "Config dir: {} ({})\n",
        status.config_dir, status.location
    ));
    out.push_str(&format!(
        "{} settings.json{}\n",
        mark(status.settings_exists),
        if status.settings_exists {
            format!(": {} allowed permission(s)", status.allowed_count)
        } else {
            ": not found".to_string()
        }
    ));
    out.push_str(&format!(
        "{} hook script {}\n",
        mark(status.hook_installed),
        if status.hook_installed { "installed" } else { "not installed" }
    ));
    out.push_str(&format!(
        "{} hook {}\n",
        mark(status.hook_registered),
        if status.hook_registered {
            "registered in settings"
        } else {
            "not registered in settings"
        }
    ));

    out.push_str("\nShell aliases:\n");
    for (rel, state) in &status.aliases {
        let line = match state {
            None => format!("  ⚪ ~/{rel}: not found"),
            Some(true) => format!("  ✅ ~/{rel}: configured"),
            Some(false) => format!("  ⚪ ~/{rel}: not configured"),
        };
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str("\nTools:\n");
    for (name, version) in [
        ("claude", &status.claude_version),
        ("chezmoi", &status.chezmoi_version),
    ] {
        out.push_str(&format!(
            "  {name}: {}\n",
            version.as_deref().unwrap_or("not found")
        ));
    }
    out
}

pub fn show(paths: &PathResolver, runner: &dyn CommandRunner) -> Result<()> {
    let status = collect(paths, runner)?;
    print!("{}", render(&status));
    Ok(())
}
