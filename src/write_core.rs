use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Unix mode for the written file. `None` keeps the existing file's
    /// permissions (or the temp-file default for new files).
    pub mode: Option<u32>,
}

impl WriteOptions {
    pub fn executable() -> Self {
        Self { mode: Some(0o755) }
    }
}

pub struct AtomicWriter {
    options: WriteOptions,
}

impl AtomicWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn write_str(&self, path: &Path, content: &str) -> Result<()> {
        self.write_bytes(path, content.as_bytes())
    }

    /// Replace `path` with `content` via a sibling temp file and rename.
    pub fn write_bytes(&self, path: &Path, content: &[u8]) -> Result<()> {
        let parent = path.parent().with_context(|| {
            format!(
                "Cannot write to {}: path has no parent directory",
                path.display()
            )
        })?;
        // relative paths like "settings.json" yield parent=""
        let parent: &Path = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };

        let existing_meta = match fs::metadata(path) {
            Ok(meta) => Some(meta),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to stat {}", path.display()));
            }
        };

        let mut temp_file = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;

        {
            let mut writer = BufWriter::new(temp_file.as_file_mut());
            writer
                .write_all(content)
                .with_context(|| format!("Failed to write {} bytes to temp file", content.len()))?;
            writer.flush().context("Failed to flush temp file")?;
        }

        match (self.options.mode, existing_meta) {
            (Some(mode), _) => set_mode(temp_file.path(), mode)?,
            (None, Some(meta)) => {
                fs::set_permissions(temp_file.path(), meta.permissions()).with_context(|| {
                    format!(
                        "Failed to preserve permissions while writing {}",
                        path.display()
                    )
                })?
            }
            // NamedTempFile is created 0600; give new files the usual umask default.
            (None, None) => set_mode(temp_file.path(), 0o644)?,
        }

        temp_file.persist(path).map_err(|e| {
            anyhow::Error::new(e.error)
                .context(format!("Failed to atomically replace {}", path.display()))
        })?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file");
        Ok(())
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).with_context(|| {
        format!(
            "Failed to set permissions {:o} on {}",
            mode,
            path.display()
        )
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
