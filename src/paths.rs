//! Where configuration files physically live.
//!
//! When chezmoi manages `~/.claude`, files are written into its source tree
//! and applied at the end of the run. The probe runs once per [`PathResolver`];
//! `CLAUDE_DIR_OVERRIDE` bypasses it completely so sandboxes never touch the
//! real dotfile setup.

use std::cell::{OnceCell, RefCell};
use std::path::{Path, PathBuf};

use crate::chezmoi::DotfileManager;
use crate::config::Config;

/// Prefix chezmoi uses to mark source files that must be executable.
pub const EXECUTABLE_PREFIX: &str = "executable_";

#[derive(Debug, Clone, PartialEq, Eq)]
struct RootState {
    managed: bool,
    source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target_path: PathBuf,
    pub managed: bool,
}

pub struct PathResolver {
    config: Config,
    manager: Box<dyn DotfileManager>,
    root: OnceCell<RootState>,
    tracked: RefCell<Vec<PathBuf>>,
}

impl PathResolver {
    pub fn new(config: Config, manager: Box<dyn DotfileManager>) -> Self {
        Self {
            config,
            manager,
            root: OnceCell::new(),
            tracked: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn home(&self) -> &Path {
        &self.config.home
    }

    pub fn is_override_active(&self) -> bool {
        self.config.claude_dir_override.is_some()
    }

    pub fn manager_available(&self) -> bool {
        self.manager.is_available()
    }

    /// Whether `~/.claude` lives in the chezmoi source tree.
    pub fn is_managed(&self) -> bool {
        if self.is_override_active() {
            return false;
        }
        self.root_state().managed
    }

    pub fn config_dir(&self) -> PathBuf {
        if let Some(dir) = &self.config.claude_dir_override {
            return dir.clone();
        }
        match &self.root_state().source_path {
            Some(source) => source.clone(),
            None => self.config.default_claude_dir(),
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        if self.is_managed() {
            EXECUTABLE_PREFIX
        } else {
            ""
        }
    }

    /// Uncached: any dotfile may or may not be managed independently of
    /// `~/.claude`.
    pub fn resolve_target(&self, path: &Path) -> ResolvedTarget {
        match self.manager.source_path(path) {
            Some(source) => ResolvedTarget {
                target_path: source,
                managed: true,
            },
            None => ResolvedTarget {
                target_path: path.to_path_buf(),
                managed: false,
            },
        }
    }

    pub fn reverse_resolve(&self, source: &Path) -> Option<PathBuf> {
        self.manager.target_path(source)
    }

    /// Record a written file for the final apply. Source paths are normalized
    /// to their target form.
    pub fn track(&self, path: &Path) {
        let target = self
            .reverse_resolve(path)
            .unwrap_or_else(|| path.to_path_buf());
        let mut tracked = self.tracked.borrow_mut();
        if !tracked.contains(&target) {
            tracing::debug!(path = %target.display(), "tracking modified file");
            tracked.push(target);
        }
    }

    pub fn tracked(&self) -> Vec<PathBuf> {
        self.tracked.borrow().clone()
    }

    pub fn has_tracked(&self) -> bool {
        !self.tracked.borrow().is_empty()
    }

    /// Apply every tracked file in order, stopping at the first failure.
    /// Earlier applies are not rolled back.
    pub fn flush_tracked(&self) -> bool {
        for target in self.tracked.borrow().iter() {
            if !self.manager.apply(target) {
                tracing::warn!(path = %target.display(), "chezmoi apply failed");
                return false;
            }
        }
        true
    }

    fn root_state(&self) -> &RootState {
        self.root.get_or_init(|| self.probe_root())
    }

    fn probe_root(&self) -> RootState {
        let unmanaged = RootState {
            managed: false,
            source_path: None,
        };
        if !self.manager.is_available() {
            tracing::debug!("chezmoi not available");
            return unmanaged;
        }
        match self.manager.source_path(&self.config.default_claude_dir()) {
            Some(source) => RootState {
                managed: true,
                source_path: Some(source),
            },
            None => unmanaged,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// In-memory dotfile manager. Counters are shared so tests can keep a
    /// handle after the fake is boxed into a resolver.
    #[derive(Default, Clone)]
    pub struct FakeManager {
        pub available: bool,
        /// target -> source
        pub sources: HashMap<PathBuf, PathBuf>,
        pub failing_applies: Vec<PathBuf>,
        pub applied: Rc<RefCell<Vec<PathBuf>>>,
        pub source_queries: Rc<Cell<usize>>,
    }

    impl FakeManager {
        pub fn unavailable() -> Self {
            Self::default()
        }

        pub fn managing(pairs: &[(&Path, &Path)]) -> Self {
            Self {
                available: true,
                sources: pairs
                    .iter()
                    .map(|(t, s)| (t.to_path_buf(), s.to_path_buf()))
                    .collect(),
                ..Self::default()
            }
        }
    }

    impl DotfileManager for FakeManager {
        fn is_available(&self) -> bool {
            self.available
        }

        fn source_path(&self, target: &Path) -> Option<PathBuf> {
            self.source_queries.set(self.source_queries.get() + 1);
            if !self.available {
                return None;
            }
            self.sources.get(target).cloned()
        }

        fn target_path(&self, source: &Path) -> Option<PathBuf> {
            if !self.available {
                return None;
            }
            self.sources
                .iter()
                .find(|(_, s)| s.as_path() == source)
                .map(|(t, _)| t.clone())
        }

        fn apply(&self, target: &Path) -> bool {
            if self.failing_applies.iter().any(|p| p == target) {
                return false;
            }
            self.applied.borrow_mut().push(target.to_path_buf());
            true
        }
    }

    pub fn resolver(config: Config, manager: FakeManager) -> PathResolver {
        PathResolver::new(config, Box::new(manager))
    }

    /// Resolver rooted at `dir/.claude` via the override, no chezmoi.
    pub fn sandboxed(dir: &Path) -> PathResolver {
        resolver(
            Config::from_parts(dir, None, Some(dir.join(".claude"))),
            FakeManager::unavailable(),
        )
    }
}
