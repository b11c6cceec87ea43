//! Manifest-to-Dockerfile compiler
//!
//! [`Compiler`] ties the pipeline together for one repository: locate the
//! manifest, parse it, pick a render mode, render. The location and the parsed
//! manifest are computed on first use and cached for the lifetime of the
//! instance, so an instance describes one snapshot of the repository. Create a
//! new instance to pick up changes on disk.

use crate::discovery::ManifestLocator;
use crate::errors::{RenderError, Result};
use crate::manifest::Manifest;
use crate::render::{RenderMode, RenderOptions, RenderedScript, ScriptRenderer};
use once_cell::unsync::OnceCell;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct Compiler {
    locator: ManifestLocator,
    options: RenderOptions,
    manifest_path: OnceCell<Option<PathBuf>>,
    manifest: OnceCell<Option<Manifest>>,
}

impl Compiler {
    pub fn new(locator: ManifestLocator, options: RenderOptions) -> Self {
        Self {
            locator,
            options,
            manifest_path: OnceCell::new(),
            manifest: OnceCell::new(),
        }
    }

    /// Compiler for `repo_root`, detecting its `binder/` or `.binder/`
    /// configuration directory.
    pub fn detect(repo_root: impl Into<PathBuf>, options: RenderOptions) -> Result<Self> {
        Ok(Self::new(ManifestLocator::detect(repo_root)?, options))
    }

    pub fn repo_root(&self) -> &Path {
        self.locator.repo_root()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Repository-relative path of the manifest, if there is one.
    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path
            .get_or_init(|| self.locator.locate())
            .as_deref()
    }

    /// Whether this compiler applies to the repository at all.
    pub fn applies(&self) -> bool {
        self.manifest_path().is_some()
    }

    /// Parsed manifest, or `None` when the repository has none.
    pub fn manifest(&self) -> Result<Option<&Manifest>> {
        let manifest = self.manifest.get_or_try_init(|| -> Result<Option<Manifest>> {
            match self.manifest_path() {
                Some(path) => Manifest::load(self.repo_root(), path).map(Some),
                None => Ok(None),
            }
        })?;
        Ok(manifest.as_ref())
    }

    /// The manifest, or [`RenderError::ManifestAbsent`].
    pub fn require_manifest(&self) -> Result<&Manifest> {
        self.manifest()?.ok_or_else(|| {
            RenderError::ManifestAbsent {
                repo: self.repo_root().to_path_buf(),
            }
            .into()
        })
    }

    /// Render path the manifest would take.
    pub fn mode(&self) -> Result<RenderMode> {
        let manifest = self.require_manifest()?;
        Ok(ScriptRenderer::new(manifest, &self.options).mode())
    }

    /// Render the build script.
    #[instrument(skip_all, fields(repo = %self.repo_root().display()))]
    pub fn render(&self) -> Result<RenderedScript> {
        let manifest = self.require_manifest()?;
        debug!("Rendering {}", manifest.path().display());
        ScriptRenderer::new(manifest, &self.options).render(self.repo_root())
    }
}
