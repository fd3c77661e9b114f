mod chezmoi;
mod config;
mod error;
mod exec;
mod hooks;
mod output;
mod paths;
mod settings;
mod shell_alias;
mod status;
mod write_core;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chezmoi::Chezmoi;
use config::Config;
use exec::ShellRunner;
use hooks::HookInstaller;
use paths::PathResolver;
use settings::SettingsStore;
use shell_alias::ShellAliasConfigurator;

#[derive(Parser)]
#[command(
    name = "claude-code-plus",
    version,
    about = "Configure Claude Code: auto-approve hook, permissions and shell aliases",
    long_about = "Installs an auto-approve PreToolUse hook, merges permissions and env into settings.json and adds a SHELL-pinning `claude` wrapper to bash, zsh and fish. Files managed by chezmoi are edited in the source tree and applied at the end."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Do not run `chezmoi apply` for modified files
    #[arg(long, global = true)]
    no_apply: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install and register the hook; with --shell also pin SHELL and add aliases
    Setup {
        /// Shell binary Claude should use for its Bash tool
        #[arg(long)]
        shell: Option<String>,
    },

    /// Manage the auto-approve hook
    Hook {
        #[command(subcommand)]
        command: HookCommands,
    },

    /// Add a `claude` wrapper that pins SHELL to existing shell startup files
    Alias {
        /// Shell binary to pin (defaults to $SHELL)
        #[arg(long)]
        shell: Option<String>,
    },

    /// Add permissions to permissions.allow
    Allow {
        /// Permission tokens, e.g. "Bash(git status:*)"
        #[arg(required = true)]
        tokens: Vec<String>,

        /// Only report whether each token is allowed
        #[arg(long)]
        check: bool,
    },

    /// Set an environment variable in settings.json
    Env { name: String, value: String },

    /// Show what is configured
    Status,
}

#[derive(Subcommand)]
enum HookCommands {
    /// Write the hook script
    Install,
    /// Register the hook in settings.json
    Register,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    output::init_colors();

    let config = Config::from_env()?;
    let paths = PathResolver::new(config, Box::new(Chezmoi::new()));

    match cli.command {
        Commands::Setup { shell } => {
            let installer = HookInstaller::new(&paths);
            installer.install()?;
            installer.register_in_settings()?;

            if let Some(shell) = shell {
                SettingsStore::new(&paths).set_env("SHELL", &shell)?;
                output::success(&format!("Claude will use {shell} for Bash commands"));
                ShellAliasConfigurator::new(&paths).configure(&shell)?;
                output::info(&format!(
                    "Reload your shell: {}",
                    shell_alias::source_command(paths.config().shell_or_default())
                ));
            }
        }

        Commands::Hook { command } => {
            let installer = HookInstaller::new(&paths);
            match command {
                HookCommands::Install => installer.install()?,
                HookCommands::Register => {
                    installer.register_in_settings()?;
                }
            }
        }

        Commands::Alias { shell } => {
            let shell = shell.unwrap_or_else(|| paths.config().shell_or_default().to_string());
            let outcomes = ShellAliasConfigurator::new(&paths).configure(&shell)?;
            if outcomes.is_empty() {
                output::warn("No shell startup files found; nothing to configure");
            } else {
                output::info(&format!(
                    "Reload your shell: {}",
                    shell_alias::source_command(paths.config().shell_or_default())
                ));
            }
        }

        Commands::Allow { tokens, check } => {
            let store = SettingsStore::new(&paths);
            if check {
                for token in &tokens {
                    if store.has_permission(token)? {
                        output::success(&format!("{token} is allowed"));
                    } else {
                        output::info(&format!("{token} is not allowed"));
                    }
                }
            } else {
                let added = match tokens.as_slice() {
                    [token] => usize::from(store.add_permission(token)?),
                    many => store.add_permissions(many)?,
                };
                let skipped = tokens.len() - added;
                output::success(&format!(
                    "Added {added} permission(s) to {}",
                    output::file(store.path())
                ));
                if skipped > 0 {
                    output::info(&format!("{skipped} already present or duplicated"));
                }
            }
        }

        Commands::Env { name, value } => {
            let store = SettingsStore::new(&paths);
            store.set_env(&name, &value)?;
            output::success(&format!("Set env.{name} in {}", output::file(store.path())));
        }

        Commands::Status => {
            status::show(&paths, &ShellRunner)?;
        }
    }

    apply_tracked(&paths, cli.no_apply)
}

/// Final sync of everything written this run back through chezmoi.
fn apply_tracked(paths: &PathResolver, no_apply: bool) -> Result<()> {
    if !paths.has_tracked() {
        return Ok(());
    }
    if no_apply || paths.is_override_active() || !paths.manager_available() {
        tracing::debug!(files = ?paths.tracked(), "skipping chezmoi apply");
        return Ok(());
    }

    output::info("Applying chezmoi changes...");
    if !paths.flush_tracked() {
        bail!("chezmoi apply failed; remaining files were not applied");
    }
    output::success("chezmoi changes applied");
    Ok(())
}
