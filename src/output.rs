//! User-facing progress lines. Diagnostics go through `tracing` instead.

use colored::Colorize;
use std::path::Path;

pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// A path formatted for inclusion in a message.
pub fn file(path: impl AsRef<Path>) -> String {
    path.as_ref().display().to_string().cyan().to_string()
}

/// Force plain output when `NO_COLOR` is set.
pub fn init_colors() {
    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }
}
