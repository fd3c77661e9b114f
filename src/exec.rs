//! Shell command execution helpers.
//!
//! Every failure is folded into [`ExecResult::success`]; callers treat a failed
//! command as "feature not available" rather than an error.

use std::process::{Command, Stdio};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    /// Attach the child to the controlling terminal (for interactive prompts).
    /// Nothing is captured in this mode.
    pub inherit_output: bool,
}

impl ExecOptions {
    pub fn inherit() -> Self {
        Self {
            inherit_output: true,
        }
    }
}

pub trait CommandRunner {
    fn run(&self, command: &str, options: ExecOptions) -> ExecResult;

    fn capture(&self, command: &str) -> ExecResult {
        self.run(command, ExecOptions::default())
    }
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, options: ExecOptions) -> ExecResult {
        tracing::debug!(command, inherit = options.inherit_output, "exec");

        if options.inherit_output {
            let status = Command::new("sh")
                .arg("-c")
                .arg(command)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status();
            return ExecResult {
                success: matches!(status, Ok(s) if s.success()),
                ..ExecResult::default()
            };
        }

        match Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => {
                let result = ExecResult {
                    success: output.status.success(),
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                };
                tracing::trace!(
                    command,
                    success = result.success,
                    stdout = %result.stdout,
                    stderr = %result.stderr,
                    "exec result"
                );
                result
            }
            Err(err) => {
                tracing::debug!(command, error = %err, "failed to spawn sh");
                ExecResult::default()
            }
        }
    }
}

/// True iff `command -v <name>` resolves to something.
pub fn command_exists(runner: &dyn CommandRunner, name: &str) -> bool {
    let result = runner.capture(&format!("command -v {}", shell_quote(name)));
    result.success && !result.stdout.is_empty()
}

/// First line of `<name> <flag>` output, best effort.
pub fn command_version(runner: &dyn CommandRunner, name: &str, flag: &str) -> Option<String> {
    let result = runner.capture(&format!("{} {} 2>/dev/null", shell_quote(name), flag));
    if !result.success {
        return None;
    }
    Some(result.stdout.lines().next().unwrap_or_default().to_string())
}

/// Single-quote `arg` for POSIX sh.
pub fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./~:@%+=,".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}
