//! Claude Code `settings.json` manipulation.
//!
//! The document is held as a `serde_json` map so that fields this tool never
//! touches, including odd shapes and explicit nulls, are written back
//! verbatim and in their original order (`preserve_order`).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

use crate::error::SetupError;
use crate::output;
use crate::paths::PathResolver;
use crate::write_core::{AtomicWriter, WriteOptions};

pub const SETTINGS_FILENAME: &str = "settings.json";
const PRE_TOOL_USE: &str = "PreToolUse";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    root: Map<String, Value>,
}

/// A `PreToolUse` record to merge. Records are keyed by `matcher`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatcherHook {
    pub matcher: String,
    pub hooks: Vec<HookEntry>,
}

/// Keyed by `command` within its record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub command: String,
}

impl HookEntry {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: "command".to_string(),
            command: command.into(),
        }
    }
}

impl MatcherHook {
    pub fn new(matcher: impl Into<String>, hooks: Vec<HookEntry>) -> Self {
        Self {
            matcher: matcher.into(),
            hooks,
        }
    }
}

/// `parent[key]` as an object; missing or null becomes `{}`.
fn object_field<'v>(
    parent: &'v mut Map<String, Value>,
    key: &str,
) -> Result<&'v mut Map<String, Value>> {
    let slot = parent.entry(key).or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    let Value::Object(map) = slot else {
        bail!("expected `{key}` in settings to be an object");
    };
    Ok(map)
}

/// `parent[key]` as an array; missing or null becomes `[]`.
fn array_field<'v>(parent: &'v mut Map<String, Value>, key: &str) -> Result<&'v mut Vec<Value>> {
    let slot = parent.entry(key).or_insert(Value::Null);
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    let Value::Array(items) = slot else {
        bail!("expected `{key}` in settings to be an array");
    };
    Ok(items)
}

fn command_of(entry: &Value) -> Option<&str> {
    entry.get("command").and_then(Value::as_str)
}

impl Settings {
    fn allow_list(&self) -> &[Value] {
        self.root
            .get("permissions")
            .and_then(|p| p.get("allow"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_permission(&self, token: &str) -> bool {
        self.allow_list().iter().any(|t| t.as_str() == Some(token))
    }

    /// String entries of `permissions.allow`.
    pub fn allowed(&self) -> Vec<&str> {
        self.allow_list().iter().filter_map(Value::as_str).collect()
    }

    /// Appends every token not yet allowed; returns how many were new.
    pub fn allow_all<'t>(&mut self, tokens: impl IntoIterator<Item = &'t str>) -> Result<usize> {
        let permissions = object_field(&mut self.root, "permissions")?;
        let allow = array_field(permissions, "allow")?;
        let mut added = 0;
        for token in tokens {
            if !allow.iter().any(|t| t.as_str() == Some(token)) {
                allow.push(Value::from(token));
                added += 1;
            }
        }
        Ok(added)
    }

    /// Merge `incoming` into the record with the same matcher, appending only
    /// commands that record lacks. Unknown matchers are appended whole.
    pub fn merge_hook(&mut self, incoming: &MatcherHook) -> Result<()> {
        let hooks = object_field(&mut self.root, "hooks")?;
        let pre = array_field(hooks, PRE_TOOL_USE)?;

        let existing = pre.iter_mut().filter_map(Value::as_object_mut).find(|record| {
            record.get("matcher").and_then(Value::as_str) == Some(incoming.matcher.as_str())
        });
        match existing {
            Some(record) => {
                let entries = array_field(record, "hooks")?;
                for entry in &incoming.hooks {
                    if !entries
                        .iter()
                        .any(|h| command_of(h) == Some(entry.command.as_str()))
                    {
                        entries.push(serde_json::to_value(entry)?);
                    }
                }
            }
            None => pre.push(serde_json::to_value(incoming)?),
        }
        Ok(())
    }

    pub fn has_hook(&self, command: &str) -> bool {
        self.root
            .get("hooks")
            .and_then(|h| h.get(PRE_TOOL_USE))
            .and_then(Value::as_array)
            .is_some_and(|pre| {
                pre.iter()
                    .filter_map(|record| record.get("hooks").and_then(Value::as_array))
                    .flatten()
                    .any(|h| command_of(h) == Some(command))
            })
    }

    pub fn set_env(&mut self, name: &str, value: &str) -> Result<()> {
        object_field(&mut self.root, "env")?.insert(name.to_string(), Value::from(value));
        Ok(())
    }

    /// Pretty JSON (2-space indent) plus trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        json.push('\n');
        Ok(json)
    }
}

/// Read-modify-write access to `{config_dir}/settings.json`. Every mutation
/// reloads from disk first.
pub struct SettingsStore<'a> {
    paths: &'a PathResolver,
}

impl<'a> SettingsStore<'a> {
    pub fn new(paths: &'a PathResolver) -> Self {
        Self { paths }
    }

    pub fn path(&self) -> PathBuf {
        self.paths.config_dir().join(SETTINGS_FILENAME)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Anything that is not a JSON object is malformed.
    pub fn load(&self) -> Result<Settings> {
        let path = self.path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&raw)
            .map_err(|source| SetupError::MalformedSettings { path, source })?;
        Ok(settings)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        self.ensure_config_dir()?;
        let path = self.path();
        let json = settings.to_json()?;
        AtomicWriter::new(WriteOptions::default()).write_str(&path, &json)?;
        self.paths.track(&path);
        Ok(())
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        let dir = self.paths.config_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            output::info(&format!("Created {}", output::file(&dir)));
        }
        Ok(())
    }

    pub fn set_env(&self, name: &str, value: &str) -> Result<()> {
        let mut settings = self.load()?;
        settings.set_env(name, value)?;
        self.save(&settings)
    }

    /// Returns false, without writing, when the token is already allowed.
    pub fn add_permission(&self, token: &str) -> Result<bool> {
        let mut settings = self.load()?;
        if settings.allow_all([token])? == 0 {
            return Ok(false);
        }
        self.save(&settings)?;
        Ok(true)
    }

    /// Batched [`add_permission`](Self::add_permission): one save, only if
    /// something was added.
    pub fn add_permissions<S: AsRef<str>>(&self, tokens: &[S]) -> Result<usize> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let mut settings = self.load()?;
        let added = settings.allow_all(tokens.iter().map(|t| t.as_ref()))?;
        if added > 0 {
            self.save(&settings)?;
        }
        Ok(added)
    }

    pub fn has_permission(&self, token: &str) -> Result<bool> {
        Ok(self.load()?.has_permission(token))
    }

    /// Always saves and returns true: this configures, it does not test for
    /// novelty.
    pub fn add_hook(&self, config: &MatcherHook) -> Result<bool> {
        let mut settings = self.load()?;
        settings.merge_hook(config)?;
        self.save(&settings)?;
        Ok(true)
    }

    pub fn has_hook(&self, command: &str) -> Result<bool> {
        Ok(self.load()?.has_hook(command))
    }
}
