//! Settings file
//!
//! An optional TOML file supplying defaults for render parameters. Values given
//! on the command line take precedence over the file, which takes precedence
//! over built-in defaults.
//!
//! ```toml
//! default_base_image = "docker.io/library/buildpack-deps:jammy"
//!
//! [user]
//! name = "jovyan"
//! uid = 1000
//!
//! [packages]
//! extra = ["vim"]
//!
//! [extensions]
//! install = true
//! blocked = ["some.proprietary-ext"]
//!
//! [extensions.remap]
//! "old.publisher-ext" = "new.publisher-ext"
//! ```

use crate::errors::{Result, SettingsError};
use crate::render::RenderOptions;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Environment variable naming a settings file when `--settings` is not given
pub const SETTINGS_ENV_VAR: &str = "HUBPACK_SETTINGS";

/// Reason attached to blocklist entries added through settings
pub const SETTINGS_BLOCK_REASON: &str = "blocked by settings";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub default_base_image: Option<String>,
    #[serde(default)]
    pub user: UserSettings,
    #[serde(default)]
    pub packages: PackageSettings,
    #[serde(default)]
    pub extensions: ExtensionSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserSettings {
    pub name: Option<String>,
    pub uid: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSettings {
    /// Added to the built-in base package list
    #[serde(default)]
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionSettings {
    pub install: Option<bool>,
    /// Added to the built-in blocklist
    #[serde(default)]
    pub blocked: Vec<String>,
    /// Added to (or overriding) the built-in remap table
    #[serde(default)]
    pub remap: IndexMap<String, String>,
}

impl Settings {
    /// Parse settings from TOML text; `path` is used for error reporting.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| {
            SettingsError::Parsing {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(path, &text)?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Load from `explicit`, else from `HUBPACK_SETTINGS`, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(SETTINGS_ENV_VAR).map(PathBuf::from));
        match path {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Fold these settings into render options built from defaults.
    pub fn render_options(&self) -> RenderOptions {
        let mut options = RenderOptions::default();

        if let Some(image) = &self.default_base_image {
            options.default_base_image = image.clone();
        }
        if let Some(name) = &self.user.name {
            options.nb_user = name.clone();
        }
        if let Some(uid) = self.user.uid {
            options.nb_uid = uid;
        }
        options
            .base_packages
            .extend(self.packages.extra.iter().cloned());
        if let Some(install) = self.extensions.install {
            options.install_extensions = install;
        }
        for id in &self.extensions.blocked {
            options.extension_tables.block(id, SETTINGS_BLOCK_REASON);
        }
        for (from, to) in &self.extensions.remap {
            options.extension_tables.remap(from, to);
        }

        options
    }
}
