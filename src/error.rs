use std::path::PathBuf;
use thiserror::Error;

/// Fatal setup conditions. Everything recoverable (missing chezmoi, failed
/// lookups) is signalled through return values instead.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot determine home directory (is HOME set?)")]
    HomeNotFound,
    #[error("hook script not found at {}", path.display())]
    MissingAsset { path: PathBuf },
    #[error("failed to parse {}", path.display())]
    MalformedSettings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
