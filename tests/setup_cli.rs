use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const MARKER: &str = "# Added by claude-code-plus for shell alias";
const HOOK_COMMAND: &str = "$HOME/.claude/hooks/auto-approve-allowed-commands.sh";

/// Fake home with `CLAUDE_DIR_OVERRIDE` pointing inside it, so neither the
/// real `~/.claude` nor chezmoi is touched.
struct Sandbox {
    _tmp: tempfile::TempDir,
    home: PathBuf,
    claude_dir: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).expect("create home");
        let claude_dir = tmp.path().join("claude");
        Self {
            _tmp: tmp,
            home,
            claude_dir,
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_claude-code-plus"));
        cmd.env("HOME", &self.home)
            .env("CLAUDE_DIR_OVERRIDE", &self.claude_dir)
            .env("SHELL", "/bin/bash")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.cmd().args(args).output().expect("run claude-code-plus")
    }

    fn settings_path(&self) -> PathBuf {
        self.claude_dir.join("settings.json")
    }

    fn settings(&self) -> serde_json::Value {
        let raw = fs::read_to_string(self.settings_path()).expect("read settings");
        serde_json::from_str(&raw).expect("parse settings")
    }
}

fn assert_ok(out: &Output) {
    assert!(
        out.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
}

fn markers(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().matches(MARKER).count()
}

#[test]
fn allow_writes_exact_document_and_is_idempotent() {
    let sb = Sandbox::new();

    assert_ok(&sb.run(&["allow", "Bash(ls:*)"]));
    let first = fs::read_to_string(sb.settings_path()).unwrap();
    assert_eq!(
        first,
        "{\n  \"permissions\": {\n    \"allow\": [\n      \"Bash(ls:*)\"\n    ]\n  }\n}\n"
    );

    let out = sb.run(&["allow", "Bash(ls:*)"]);
    assert_ok(&out);
    assert!(String::from_utf8_lossy(&out.stdout).contains("Added 0 permission(s)"));
    assert_eq!(fs::read_to_string(sb.settings_path()).unwrap(), first);
}

#[test]
fn allow_batch_dedupes_and_keeps_order() {
    let sb = Sandbox::new();
    fs::create_dir_all(&sb.claude_dir).unwrap();
    fs::write(sb.settings_path(), r#"{"permissions":{"allow":["b"]}}"#).unwrap();

    let out = sb.run(&["allow", "a", "b", "a", "c"]);
    assert_ok(&out);
    assert!(String::from_utf8_lossy(&out.stdout).contains("Added 2 permission(s)"));
    assert_eq!(
        sb.settings()["permissions"]["allow"],
        serde_json::json!(["b", "a", "c"])
    );
}

#[test]
fn allow_check_does_not_write() {
    let sb = Sandbox::new();

    let out = sb.run(&["allow", "--check", "Read"]);
    assert_ok(&out);
    assert!(String::from_utf8_lossy(&out.stdout).contains("Read is not allowed"));
    assert!(!sb.settings_path().exists());
}

#[cfg(unix)]
#[test]
fn setup_installs_and_registers_hook() {
    use std::os::unix::fs::PermissionsExt;
    let sb = Sandbox::new();

    assert_ok(&sb.run(&["setup"]));
    assert_ok(&sb.run(&["setup"]));

    let hook = sb
        .claude_dir
        .join("hooks")
        .join("auto-approve-allowed-commands.sh");
    let mode = fs::metadata(&hook).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    let asset = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join("auto-approve-allowed-commands.sh");
    assert_eq!(fs::read(&hook).unwrap(), fs::read(asset).unwrap());

    let pre = &sb.settings()["hooks"]["PreToolUse"];
    assert_eq!(
        pre,
        &serde_json::json!([{
            "matcher": "Bash",
            "hooks": [{"type": "command", "command": HOOK_COMMAND}]
        }])
    );
}

#[test]
fn hook_register_merges_into_existing_bash_matcher() {
    let sb = Sandbox::new();
    fs::create_dir_all(&sb.claude_dir).unwrap();
    fs::write(
        sb.settings_path(),
        r#"{"hooks":{"PreToolUse":[{"matcher":"Bash","hooks":[{"type":"command","command":"/usr/local/bin/guard"}]}]}}"#,
    )
    .unwrap();

    assert_ok(&sb.run(&["hook", "register"]));
    let after_first = fs::read_to_string(sb.settings_path()).unwrap();
    assert_ok(&sb.run(&["hook", "register"]));
    assert_eq!(fs::read_to_string(sb.settings_path()).unwrap(), after_first);

    let pre = sb.settings()["hooks"]["PreToolUse"].clone();
    assert_eq!(pre.as_array().unwrap().len(), 1);
    assert_eq!(pre[0]["hooks"][0]["command"], "/usr/local/bin/guard");
    assert_eq!(pre[0]["hooks"][1]["command"], HOOK_COMMAND);
}

#[test]
fn setup_with_shell_pins_env_and_aliases_existing_files_only() {
    let sb = Sandbox::new();
    let zshrc = sb.home.join(".zshrc");
    fs::write(&zshrc, "export EDITOR=vim").unwrap();

    assert_ok(&sb.run(&["setup", "--shell", "/opt/homebrew/bin/bash"]));
    assert_ok(&sb.run(&["setup", "--shell", "/opt/homebrew/bin/bash"]));

    assert_eq!(sb.settings()["env"]["SHELL"], "/opt/homebrew/bin/bash");
    assert_eq!(markers(&zshrc), 1);
    let content = fs::read_to_string(&zshrc).unwrap();
    assert!(content.starts_with(&format!("export EDITOR=vim\n\n{MARKER}\n")));
    assert!(content.contains("SHELL=\"/opt/homebrew/bin/bash\" command claude \"$@\""));
    assert!(!sb.home.join(".bashrc").exists());
    assert!(!sb.home.join(".config/fish/config.fish").exists());
}

#[test]
fn alias_without_startup_files_is_not_an_error() {
    let sb = Sandbox::new();

    let out = sb.run(&["alias"]);
    assert_ok(&out);
    assert!(String::from_utf8_lossy(&out.stdout).contains("nothing to configure"));
    assert_eq!(fs::read_dir(&sb.home).unwrap().count(), 0);
}

#[test]
fn env_preserves_unknown_keys() {
    let sb = Sandbox::new();
    fs::create_dir_all(&sb.claude_dir).unwrap();
    fs::write(
        sb.settings_path(),
        r#"{"model":"opus","includeCoAuthoredBy":false,"permissions":{"allow":["Read"],"ask":["Bash(rm:*)"]}}"#,
    )
    .unwrap();

    assert_ok(&sb.run(&["env", "SHELL", "/bin/zsh"]));

    let settings = sb.settings();
    assert_eq!(settings["model"], "opus");
    assert_eq!(settings["includeCoAuthoredBy"], false);
    assert_eq!(settings["permissions"]["ask"], serde_json::json!(["Bash(rm:*)"]));
    assert_eq!(settings["env"]["SHELL"], "/bin/zsh");
}

#[test]
fn malformed_settings_fails_without_rewriting() {
    let sb = Sandbox::new();
    fs::create_dir_all(&sb.claude_dir).unwrap();
    fs::write(sb.settings_path(), "{\"permissions\": ").unwrap();

    let out = sb.run(&["allow", "Read"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to parse"));
    assert_eq!(
        fs::read_to_string(sb.settings_path()).unwrap(),
        "{\"permissions\": "
    );
}

#[test]
fn status_reports_override_and_changes_nothing() {
    let sb = Sandbox::new();

    let out = sb.run(&["status"]);
    assert_ok(&out);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("(override)"));
    assert!(stdout.contains(&sb.claude_dir.display().to_string()));
    assert!(!sb.claude_dir.exists());
}
