//! Error types and handling
//!
//! The error taxonomy is structured with a specific enum per domain
//! (manifest configuration, rendering, settings) that are then wrapped in the
//! main [`HubpackError`] enum for unified error handling.
//!
//! A missing manifest is deliberately not represented here as a failure of
//! discovery: the locator returns `None` and callers treat that as "this
//! compiler does not apply".

use std::path::PathBuf;
use thiserror::Error;

/// Manifest configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Manifest text is not valid JSON after comment stripping
    #[error("Failed to parse {}: {message}", path.display())]
    Parsing { path: PathBuf, message: String },

    /// Manifest parsed but is structurally unusable
    #[error("Invalid manifest {}: {message}", path.display())]
    Validation { path: PathBuf, message: String },

    /// Manifest file could not be read
    #[error("Failed to read manifest {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Both `binder/` and `.binder/` exist at the repository root
    #[error("The repository contains both a 'binder' and a '.binder' directory; only one is allowed: {}", repo.display())]
    AmbiguousConfigDir { repo: PathBuf },
}

/// Build-script rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// The Dockerfile referenced by `build.dockerfile` is missing or unreadable
    #[error("Failed to read Dockerfile {}", path.display())]
    DockerfileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `build.dockerfile` resolves to a file outside the repository
    #[error("Dockerfile {} is outside the repository", path.display())]
    DockerfileOutsideRepository { path: PathBuf },

    /// A render was requested for a repository without a manifest
    #[error("No devcontainer.json found in {}", repo.display())]
    ManifestAbsent { repo: PathBuf },
}

/// Settings file errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("Failed to read settings file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML or has unknown keys
    #[error("Failed to parse settings file {}: {source}", path.display())]
    Parsing {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum HubpackError {
    /// Manifest configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rendering errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Settings errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl HubpackError {
    /// Whether this error only signals that no manifest was found
    pub fn is_manifest_absent(&self) -> bool {
        matches!(self, HubpackError::Render(RenderError::ManifestAbsent { .. }))
    }
}

/// Convenience type alias for Results with HubpackError
pub type Result<T> = std::result::Result<T, HubpackError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::Parsing {
            path: PathBuf::from(".devcontainer/devcontainer.json"),
            message: "expected value at line 1 column 2".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Failed to parse .devcontainer/devcontainer.json: expected value at line 1 column 2"
        );

        let error = ConfigError::AmbiguousConfigDir {
            repo: PathBuf::from("/repo"),
        };
        assert!(format!("{}", error).contains("both a 'binder' and a '.binder'"));
    }

    #[test]
    fn test_render_error_display() {
        let error = RenderError::ManifestAbsent {
            repo: PathBuf::from("/repo"),
        };
        assert_eq!(format!("{}", error), "No devcontainer.json found in /repo");
    }

    #[test]
    fn test_hubpack_error_from_domain_errors() {
        let err: HubpackError = ConfigError::Validation {
            path: PathBuf::from("devcontainer.json"),
            message: "root must be an object".to_string(),
        }
        .into();
        assert!(matches!(err, HubpackError::Config(_)));
        assert!(!err.is_manifest_absent());

        let err: HubpackError = RenderError::ManifestAbsent {
            repo: PathBuf::from("."),
        }
        .into();
        assert!(err.is_manifest_absent());
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let render_error = RenderError::DockerfileUnreadable {
            path: PathBuf::from(".devcontainer/Dockerfile"),
            source: io_error,
        };
        let err = HubpackError::Render(render_error);

        assert!(err.source().is_some());
        if let Some(source) = err.source() {
            assert!(source.source().is_some());
        }
    }

    #[test]
    fn test_anyhow_conversions() {
        let err = HubpackError::Config(ConfigError::Parsing {
            path: PathBuf::from("devcontainer.json"),
            message: "bad".to_string(),
        });
        let anyhow_error = anyhow::Error::from(err);
        assert!(anyhow_error.to_string().contains("Configuration error"));
    }
}
