//! Manifest discovery
//!
//! Locates the devcontainer manifest inside a repository. The search order is:
//!
//! 1. `<config-dir>/.devcontainer/devcontainer.json`
//! 2. `<config-dir>/.devcontainer.json`
//! 3. `<config-dir>/devcontainer.json`
//!
//! followed by the same three names at the repository root, but only when no
//! configuration subdirectory (`binder/` or `.binder/`) is in use. The first
//! existing file wins. Finding nothing is not an error: it means this compiler
//! does not apply to the repository.

use crate::errors::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Candidate manifest names, in priority order
pub const MANIFEST_CANDIDATES: [&str; 3] = [
    ".devcontainer/devcontainer.json",
    ".devcontainer.json",
    "devcontainer.json",
];

/// Directory names recognized as a repository's configuration subdirectory
pub const CONFIG_DIR_NAMES: [&str; 2] = ["binder", ".binder"];

/// Detect the configuration subdirectory of a repository.
///
/// Returns the repository-relative directory name, `None` if neither
/// `binder/` nor `.binder/` exists, or an error if both do.
pub fn detect_config_dir(repo_root: &Path) -> Result<Option<PathBuf>> {
    let found: Vec<&str> = CONFIG_DIR_NAMES
        .iter()
        .copied()
        .filter(|name| repo_root.join(name).is_dir())
        .collect();

    match found.as_slice() {
        [] => Ok(None),
        [single] => {
            debug!("Using configuration subdirectory '{}'", single);
            Ok(Some(PathBuf::from(single)))
        }
        _ => Err(ConfigError::AmbiguousConfigDir {
            repo: repo_root.to_path_buf(),
        }
        .into()),
    }
}

/// Finds the manifest of one repository.
#[derive(Debug, Clone)]
pub struct ManifestLocator {
    repo_root: PathBuf,
    config_dir: Option<PathBuf>,
}

impl ManifestLocator {
    /// Create a locator for `repo_root` with an explicit configuration
    /// subdirectory (relative to the root), or `None` for a plain repository.
    pub fn new(repo_root: impl Into<PathBuf>, config_dir: Option<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            config_dir,
        }
    }

    /// Create a locator, detecting `binder/` or `.binder/` automatically.
    pub fn detect(repo_root: impl Into<PathBuf>) -> Result<Self> {
        let repo_root = repo_root.into();
        let config_dir = detect_config_dir(&repo_root)?;
        Ok(Self::new(repo_root, config_dir))
    }

    /// Repository root this locator searches.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Configuration subdirectory in use, relative to the repository root.
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Ordered list of repository-relative paths that are checked.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(MANIFEST_CANDIDATES.len() * 2);
        match &self.config_dir {
            Some(dir) => {
                candidates.extend(MANIFEST_CANDIDATES.iter().map(|name| dir.join(name)));
            }
            None => {
                candidates.extend(MANIFEST_CANDIDATES.iter().map(PathBuf::from));
            }
        }
        candidates
    }

    /// Return the repository-relative path of the first existing candidate.
    #[instrument(skip_all, fields(repo = %self.repo_root.display()))]
    pub fn locate(&self) -> Option<PathBuf> {
        for candidate in self.candidates() {
            let full = self.repo_root.join(&candidate);
            debug!("Checking {}", full.display());
            if full.is_file() {
                debug!("Found manifest: {}", candidate.display());
                return Some(candidate);
            }
        }
        debug!("No devcontainer manifest found");
        None
    }
}
