//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod detect;
pub mod inspect;
pub mod render;

use anyhow::{Context, Result};
use clap::Args;
use hubpack_core::compiler::Compiler;
use hubpack_core::discovery::ManifestLocator;
use hubpack_core::render::RenderOptions;
use hubpack_core::settings::Settings;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Exit code requested by a command without an error message
#[derive(Debug)]
pub struct ExitCode(pub i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {}", self.0)
    }
}

impl std::error::Error for ExitCode {}

/// Where to find the repository, its manifest and the settings file
#[derive(Debug, Clone, Default)]
pub struct CompileArgs {
    pub repo: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    pub settings: Option<PathBuf>,
}

/// Render parameters given on the command line; these win over the settings file
#[derive(Debug, Clone, Default, Args)]
pub struct RenderOverrides {
    /// Notebook user name
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,
    /// Notebook user id
    #[arg(long, value_name = "UID")]
    pub uid: Option<u32>,
    /// Base image used when the manifest names none
    #[arg(long, value_name = "IMAGE")]
    pub base_image: Option<String>,
    /// Emit editor extension install directives (true or false)
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    pub install_extensions: Option<bool>,
}

impl RenderOverrides {
    /// Apply these overrides on top of `options`.
    pub fn apply(&self, mut options: RenderOptions) -> RenderOptions {
        if let Some(user) = &self.user {
            options.nb_user = user.clone();
        }
        if let Some(uid) = self.uid {
            options.nb_uid = uid;
        }
        if let Some(image) = &self.base_image {
            options.default_base_image = image.clone();
        }
        if let Some(install) = self.install_extensions {
            options.install_extensions = install;
        }
        options
    }
}

impl CompileArgs {
    pub fn repo_root(&self) -> Result<PathBuf> {
        match &self.repo {
            Some(repo) => Ok(repo.clone()),
            None => std::env::current_dir().context("Failed to determine current directory"),
        }
    }

    /// Locator honoring `--config-dir`, else detecting `binder/` or `.binder/`.
    pub fn locator(&self) -> Result<ManifestLocator> {
        let repo_root = self.repo_root()?;
        let locator = match &self.config_dir {
            Some(dir) => ManifestLocator::new(repo_root, Some(dir.clone())),
            None => ManifestLocator::detect(repo_root)?,
        };
        Ok(locator)
    }

    /// Build a compiler: built-in defaults, then the settings file, then CLI
    /// overrides.
    pub fn compiler(&self, overrides: &RenderOverrides) -> Result<Compiler> {
        let settings = Settings::discover(self.settings.as_deref())?;
        let options = overrides.apply(settings.render_options());
        debug!("Render options: {:?}", options);
        Ok(Compiler::new(self.locator()?, options))
    }
}
