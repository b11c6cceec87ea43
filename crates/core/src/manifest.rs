//! Manifest model
//!
//! A read-only view over a parsed devcontainer manifest. All fields the
//! compiler cares about are extracted once, at parse time, into typed values;
//! accessors never fail and fall back to empty defaults when a field is
//! missing or has an unexpected type.
//!
//! Recognized fields:
//!
//! - `image`
//! - `build.dockerfile`, `build.context`, `build.args` (and the legacy
//!   top-level `dockerFile` / `context` keys)
//! - `containerEnv`, `remoteEnv`
//! - `onCreateCommand`, `postCreateCommand`, `updateContentCommand`
//! - `customizations.vscode.extensions`
//! - `features` (ids only, never resolved)
//!
//! ## References
//!
//! - [DevContainer Configuration Reference](https://containers.dev/implementors/json_reference/)

use crate::command::CommandSpec;
use crate::errors::{ConfigError, Result};
use crate::jsonc::strip_comments;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

/// Substrings marking values that reference the author's machine. These
/// cannot be resolved inside an image build.
pub const UNRESOLVABLE_ENV_MARKERS: [&str; 2] = ["${localEnv:", "${localWorkspaceFolder"];

/// Top-level keys the compiler reads. Anything else is logged and ignored.
const KNOWN_KEYS: [&str; 13] = [
    "name",
    "image",
    "build",
    "dockerFile",
    "context",
    "containerEnv",
    "remoteEnv",
    "onCreateCommand",
    "postCreateCommand",
    "updateContentCommand",
    "customizations",
    "features",
    "$schema",
];

/// Build-from-Dockerfile section of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSection {
    /// Dockerfile path, relative to the build context
    pub dockerfile: String,
    /// Build context, relative to the manifest directory
    pub context: String,
    /// Build arguments in declaration order
    pub args: IndexMap<String, String>,
}

/// Outcome of base image resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseImage {
    /// The manifest names an image
    Image(String),
    /// The image comes from the manifest's Dockerfile
    DeferredToDockerfile,
    /// Nothing declared; the caller's default applies
    Default(String),
}

/// Parsed, immutable view of a devcontainer manifest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    path: PathBuf,
    name: Option<String>,
    image: Option<String>,
    build: Option<BuildSection>,
    container_env: IndexMap<String, String>,
    remote_env: IndexMap<String, String>,
    on_create_command: CommandSpec,
    post_create_command: CommandSpec,
    update_content_command: CommandSpec,
    extensions: Vec<String>,
    features: Vec<String>,
}

impl Manifest {
    /// Read and parse the manifest at `repo_root.join(path)`.
    ///
    /// `path` is kept repository-relative; it anchors relative paths inside
    /// the manifest (see [`Manifest::dockerfile_path`]).
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(repo_root: &Path, path: &Path) -> Result<Self> {
        let full = repo_root.join(path);
        let text = std::fs::read_to_string(&full).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parse JSONC manifest text. `path` is used for error reporting and for
    /// resolving relative paths.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let stripped = strip_comments(text);
        let value: Value = serde_json::from_str(&stripped).map_err(|e| {
            debug!("Failed to parse manifest: {}", e);
            ConfigError::Parsing {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        match value {
            Value::Object(obj) => Self::from_object(path, &obj),
            _ => Err(ConfigError::Validation {
                path: path.to_path_buf(),
                message: "devcontainer manifest must contain a JSON object literal".to_string(),
            }
            .into()),
        }
    }

    /// Extract the typed view from an already-parsed JSON object.
    ///
    /// Fails only when `image` is not a single image reference, since it is
    /// written into the script verbatim.
    pub fn from_object(path: &Path, obj: &Map<String, Value>) -> Result<Self> {
        for key in obj.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                debug!("Manifest key '{}' is not used by this compiler", key);
            }
        }

        let image = string_field(obj, "image");
        if let Some(image) = &image {
            if image.is_empty() || image.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(ConfigError::Validation {
                    path: path.to_path_buf(),
                    message: format!("image {:?} is not a valid image reference", image),
                }
                .into());
            }
        }

        let manifest = Self {
            path: path.to_path_buf(),
            name: string_field(obj, "name"),
            image,
            build: extract_build(obj),
            container_env: extract_env(obj.get("containerEnv")),
            remote_env: extract_env(obj.get("remoteEnv")),
            on_create_command: CommandSpec::from_value(obj.get("onCreateCommand")),
            post_create_command: CommandSpec::from_value(obj.get("postCreateCommand")),
            update_content_command: CommandSpec::from_value(obj.get("updateContentCommand")),
            extensions: extract_extensions(obj),
            features: obj
                .get("features")
                .and_then(Value::as_object)
                .map(|f| f.keys().cloned().collect())
                .unwrap_or_default(),
        };

        debug!(
            "Parsed manifest: image={:?} build={} env={} extensions={}",
            manifest.image,
            manifest.build.is_some(),
            manifest.container_env.len(),
            manifest.extensions.len()
        );
        Ok(manifest)
    }

    /// Repository-relative manifest path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the manifest, relative to the repository root.
    /// Empty for a manifest at the root.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn build(&self) -> Option<&BuildSection> {
        self.build.as_ref()
    }

    /// Whether the manifest builds from its own Dockerfile.
    pub fn has_dockerfile(&self) -> bool {
        self.build.is_some()
    }

    /// Resolve the base image: `image` if declared, else deferred to the
    /// Dockerfile if one is declared, else `default_image`.
    pub fn base_image(&self, default_image: &str) -> BaseImage {
        match (&self.image, &self.build) {
            (Some(image), _) => BaseImage::Image(image.clone()),
            (None, Some(_)) => BaseImage::DeferredToDockerfile,
            (None, None) => BaseImage::Default(default_image.to_string()),
        }
    }

    /// Repository-relative, lexically normalized path to the declared
    /// Dockerfile: `normalize(manifest_dir / context / dockerfile)`.
    pub fn dockerfile_path(&self) -> Option<PathBuf> {
        self.build.as_ref().map(|build| {
            normalize_path(
                &self
                    .dir()
                    .join(&build.context)
                    .join(&build.dockerfile),
            )
        })
    }

    /// Build arguments, empty when there is no build section.
    pub fn build_args(&self) -> IndexMap<String, String> {
        self.build
            .as_ref()
            .map(|b| b.args.clone())
            .unwrap_or_default()
    }

    /// `containerEnv` entries that can be resolved at build time.
    pub fn container_env(&self) -> &IndexMap<String, String> {
        &self.container_env
    }

    /// `remoteEnv` entries that can be resolved at build time.
    pub fn remote_env(&self) -> &IndexMap<String, String> {
        &self.remote_env
    }

    pub fn on_create_command(&self) -> &CommandSpec {
        &self.on_create_command
    }

    pub fn post_create_command(&self) -> &CommandSpec {
        &self.post_create_command
    }

    /// Parsed for completeness; never rendered into a build script.
    pub fn update_content_command(&self) -> &CommandSpec {
        &self.update_content_command
    }

    /// `customizations.vscode.extensions` in declaration order.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Declared feature ids in declaration order.
    pub fn features(&self) -> &[String] {
        &self.features
    }
}

/// Whether an environment value can be resolved inside an image build.
pub fn is_resolvable_env_value(value: &str) -> bool {
    !UNRESOLVABLE_ENV_MARKERS
        .iter()
        .any(|marker| value.contains(marker))
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component where possible. Does not touch the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn extract_build(obj: &Map<String, Value>) -> Option<BuildSection> {
    let build = obj.get("build").and_then(Value::as_object);

    let dockerfile = build
        .and_then(|b| b.get("dockerfile"))
        .and_then(Value::as_str)
        .or_else(|| obj.get("dockerFile").and_then(Value::as_str))?;

    let context = build
        .and_then(|b| b.get("context"))
        .and_then(Value::as_str)
        .or_else(|| obj.get("context").and_then(Value::as_str))
        .unwrap_or(".");

    let args = build
        .and_then(|b| b.get("args"))
        .and_then(Value::as_object)
        .map(|args| {
            args.iter()
                .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k.clone(), v)))
                .collect()
        })
        .unwrap_or_default();

    Some(BuildSection {
        dockerfile: dockerfile.to_string(),
        context: context.to_string(),
        args,
    })
}

fn extract_env(value: Option<&Value>) -> IndexMap<String, String> {
    let Some(map) = value.and_then(Value::as_object) else {
        return IndexMap::new();
    };

    map.iter()
        .filter_map(|(key, value)| match value.as_str() {
            Some(v) if is_resolvable_env_value(v) => Some((key.clone(), v.to_string())),
            Some(_) => {
                debug!("Skipping environment variable '{}': references the local machine", key);
                None
            }
            None => {
                debug!("Skipping environment variable '{}': value is not a string", key);
                None
            }
        })
        .collect()
}

fn extract_extensions(obj: &Map<String, Value>) -> Vec<String> {
    obj.get("customizations")
        .and_then(|c| c.get("vscode"))
        .and_then(|v| v.get("extensions"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|id| {
                    let valid = !id.is_empty()
                        && !id.chars().any(|c| c.is_whitespace() || c.is_control());
                    if !valid {
                        debug!("Skipping malformed extension id {:?}", id);
                    }
                    valid
                })
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Manifest {
        Manifest::parse(Path::new(".devcontainer/devcontainer.json"), text).unwrap()
    }

    #[test]
    fn test_empty_manifest_defaults() {
        let manifest = parse("{}");
        assert_eq!(manifest.image(), None);
        assert!(manifest.build().is_none());
        assert!(manifest.container_env().is_empty());
        assert!(manifest.remote_env().is_empty());
        assert!(manifest.on_create_command().is_absent());
        assert!(manifest.post_create_command().is_absent());
        assert!(manifest.extensions().is_empty());
        assert_eq!(
            manifest.base_image("buildpack-deps:jammy"),
            BaseImage::Default("buildpack-deps:jammy".to_string())
        );
    }

    #[test]
    fn test_parse_with_comments() {
        let manifest = parse(
            r#"{
                // base image
                "image": "python:3.11", /* pinned */
                "containerEnv": {"DOCS": "https://example.com/docs"}
            }"#,
        );
        assert_eq!(manifest.image(), Some("python:3.11"));
        assert_eq!(
            manifest.container_env().get("DOCS").map(String::as_str),
            Some("https://example.com/docs")
        );
    }

    #[test]
    fn test_parse_error_carries_path() {
        let err = Manifest::parse(Path::new("binder/devcontainer.json"), "{\"image\": }")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("binder/devcontainer.json"), "{}", message);
    }

    #[test]
    fn test_trailing_comma_is_rejected() {
        assert!(Manifest::parse(Path::new("devcontainer.json"), "{\"image\": \"x\",}").is_err());
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        let err = Manifest::parse(Path::new("devcontainer.json"), "[1, 2]").unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn test_env_filters_local_references_and_keeps_order() {
        let manifest = parse(
            r#"{
                "containerEnv": {
                    "ZED": "last-declared-first",
                    "LOCAL_VAR": "${localEnv:HOME}",
                    "DATABASE_URL": "postgres://u:p@h:5432/d?sslmode=require",
                    "WS": "${localWorkspaceFolder}/data",
                    "NUMBER": 3,
                    "ALPHA": "a"
                }
            }"#,
        );
        let keys: Vec<&str> = manifest.container_env().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["ZED", "DATABASE_URL", "ALPHA"]);
        assert_eq!(
            manifest.container_env()["DATABASE_URL"],
            "postgres://u:p@h:5432/d?sslmode=require"
        );
    }

    #[test]
    fn test_remote_env_filtered_and_null_skipped() {
        let manifest = parse(
            r#"{"remoteEnv": {"A": "1", "B": null, "C": "${localWorkspaceFolderBasename}"}}"#,
        );
        let keys: Vec<&str> = manifest.remote_env().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A"]);
    }

    #[test]
    fn test_base_image_resolution() {
        assert_eq!(
            parse(r#"{"image": "python:3.11-slim"}"#).base_image("default"),
            BaseImage::Image("python:3.11-slim".to_string())
        );
        assert_eq!(
            parse(r#"{"build": {"dockerfile": "Dockerfile"}}"#).base_image("default"),
            BaseImage::DeferredToDockerfile
        );
        // build without dockerfile does not defer
        assert_eq!(
            parse(r#"{"build": {"context": ".."}}"#).base_image("default"),
            BaseImage::Default("default".to_string())
        );
    }

    #[test]
    fn test_dockerfile_path_in_config_subdirectory() {
        let manifest = parse(r#"{"build": {"dockerfile": "Dockerfile", "context": ".."}}"#);
        assert_eq!(manifest.dockerfile_path(), Some(PathBuf::from("Dockerfile")));

        let manifest = parse(r#"{"build": {"dockerfile": "Dockerfile"}}"#);
        assert_eq!(
            manifest.dockerfile_path(),
            Some(PathBuf::from(".devcontainer/Dockerfile"))
        );
    }

    #[test]
    fn test_dockerfile_path_at_root() {
        let manifest = Manifest::parse(
            Path::new("devcontainer.json"),
            r#"{"build": {"dockerfile": "./docker/../Dockerfile.dev", "context": "."}}"#,
        )
        .unwrap();
        assert_eq!(manifest.dir(), Path::new(""));
        assert_eq!(
            manifest.dockerfile_path(),
            Some(PathBuf::from("Dockerfile.dev"))
        );
    }

    #[test]
    fn test_legacy_dockerfile_keys() {
        let manifest = parse(r#"{"dockerFile": "Dockerfile", "context": "ctx"}"#);
        let build = manifest.build().unwrap();
        assert_eq!(build.dockerfile, "Dockerfile");
        assert_eq!(build.context, "ctx");
        assert_eq!(
            manifest.dockerfile_path(),
            Some(PathBuf::from(".devcontainer/ctx/Dockerfile"))
        );
    }

    #[test]
    fn test_build_args_in_order() {
        let manifest = parse(
            r#"{"build": {"dockerfile": "Dockerfile", "args": {"VARIANT": "3.11", "DEBUG": true, "SKIP": null}}}"#,
        );
        let args = manifest.build_args();
        assert_eq!(
            args.into_iter().collect::<Vec<_>>(),
            vec![
                ("VARIANT".to_string(), "3.11".to_string()),
                ("DEBUG".to_string(), "true".to_string())
            ]
        );
    }

    #[test]
    fn test_extensions_and_features() {
        let manifest = parse(
            r#"{
                "customizations": {"vscode": {"extensions": ["ms-python.python", 7, "github.copilot", "ms-python.python"]}},
                "features": {"ghcr.io/devcontainers/features/node:1": {}}
            }"#,
        );
        assert_eq!(
            manifest.extensions(),
            &["ms-python.python", "github.copilot", "ms-python.python"]
        );
        assert_eq!(
            manifest.features(),
            &["ghcr.io/devcontainers/features/node:1"]
        );
    }

    #[test]
    fn test_wrong_types_degrade_to_defaults() {
        let manifest = parse(
            r#"{"image": 5, "containerEnv": "nope", "customizations": {"vscode": {"extensions": "x"}}, "postCreateCommand": 12}"#,
        );
        assert_eq!(manifest.image(), None);
        assert!(manifest.container_env().is_empty());
        assert!(manifest.extensions().is_empty());
        assert!(manifest.post_create_command().is_absent());
    }

    #[test]
    fn test_image_must_be_single_reference() {
        for image in ["python:3.11\nUSER root", "python 3.11", ""] {
            let text = serde_json::json!({ "image": image }).to_string();
            let err = Manifest::parse(Path::new("devcontainer.json"), &text).unwrap_err();
            assert!(err.to_string().contains("not a valid image reference"), "{err}");
        }
    }

    #[test]
    fn test_malformed_extension_ids_skipped() {
        let manifest = parse(
            r#"{"customizations": {"vscode": {"extensions": ["ms-python.python", "a\nRUN x", "b c", ""]}}}"#,
        );
        assert_eq!(manifest.extensions(), &["ms-python.python"]);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_path(Path::new("./")), PathBuf::from("."));
        assert_eq!(normalize_path(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("/a/../../b")), PathBuf::from("/b"));
    }
}
