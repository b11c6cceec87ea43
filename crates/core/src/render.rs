//! Build script rendering
//!
//! Turns a [`Manifest`] into a Dockerfile that a multi-user notebook hub can
//! launch. Whatever the manifest says, the result always carries the hub's
//! platform invariants:
//!
//! - a notebook user with a stable uid (1000 unless overridden)
//! - a Python virtual environment under `/opt`, outside the home directory the
//!   hub bind-mounts over at spawn time
//! - `EXPOSE 8888`
//! - a fallback `CMD` starting `jupyterhub-singleuser`
//!
//! Two render paths exist. [`RenderMode::Image`] writes a complete script on
//! top of the manifest's `image` (or the default base image).
//! [`RenderMode::Dockerfile`] copies the manifest's own Dockerfile verbatim and
//! appends an idempotent block establishing the invariants.
//!
//! Rendering is pure text-to-text; nothing declared in the manifest is
//! executed here.

use crate::command::CommandSpec;
use crate::errors::{RenderError, Result};
use crate::extensions::{map_extensions, ExtensionPlan, ExtensionTables};
use crate::manifest::{BaseImage, Manifest};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Base image used when the manifest declares neither `image` nor a Dockerfile
pub const DEFAULT_BASE_IMAGE: &str = "docker.io/library/buildpack-deps:jammy";

/// Default notebook user name
pub const DEFAULT_NB_USER: &str = "jovyan";

/// Default notebook user id; the hub expects 1000
pub const DEFAULT_NB_UID: u32 = 1000;

/// Port the single-user server listens on
pub const NOTEBOOK_PORT: u16 = 8888;

/// Virtual environment location
pub const VENV_PATH: &str = "/opt/venv";

/// Install prefix for the browser editor used to host editor extensions
pub const CODE_SERVER_PREFIX: &str = "/opt/code-server";

/// apt packages installed in image mode
pub const DEFAULT_BASE_PACKAGES: [&str; 9] = [
    "ca-certificates",
    "curl",
    "git",
    "less",
    "unzip",
    "wget",
    "python3",
    "python3-pip",
    "python3-venv",
];

/// Python packages providing the hub's single-user server
pub const RUNTIME_PYTHON_PACKAGES: [&str; 3] = ["jupyterhub", "jupyterlab", "notebook"];

/// Marker separating a user's Dockerfile from the appended block
pub const APPENDED_BLOCK_MARKER: &str = "# --- hubpack additions for JupyterHub compatibility ---";

/// Parameters supplied by the caller rather than the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Notebook user name
    pub nb_user: String,
    /// Notebook user id
    pub nb_uid: u32,
    /// Image used when the manifest names none
    pub default_base_image: String,
    /// apt packages for image mode
    pub base_packages: Vec<String>,
    /// Emit editor extension install directives
    pub install_extensions: bool,
    /// Blocklist and remap table for editor extensions
    pub extension_tables: ExtensionTables,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            nb_user: DEFAULT_NB_USER.to_string(),
            nb_uid: DEFAULT_NB_UID,
            default_base_image: DEFAULT_BASE_IMAGE.to_string(),
            base_packages: DEFAULT_BASE_PACKAGES.iter().map(|p| p.to_string()).collect(),
            install_extensions: false,
            extension_tables: ExtensionTables::builtin(),
        }
    }
}

impl RenderOptions {
    /// Base packages, deduplicated and sorted
    pub fn packages(&self) -> BTreeSet<&str> {
        self.base_packages
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Which render path a manifest takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum RenderMode {
    /// Full script on top of a base image
    #[serde(rename_all = "camelCase")]
    Image { base_image: String },
    /// User Dockerfile plus appended block; path is repository-relative
    #[serde(rename_all = "camelCase")]
    Dockerfile { dockerfile_path: PathBuf },
}

/// A rendered build script and everything a caller needs to build it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedScript {
    /// Render path taken
    #[serde(flatten)]
    pub mode: RenderMode,
    /// Repository-relative manifest path
    pub manifest_path: PathBuf,
    /// Dockerfile text
    pub dockerfile: String,
    /// Non-fatal issues worth showing to the user
    pub warnings: Vec<String>,
    /// `build.args` to pass to the build engine
    pub build_args: IndexMap<String, String>,
    /// Editor extension decisions
    pub extensions: ExtensionPlan,
}

/// Renders one manifest with one set of options.
#[derive(Debug)]
pub struct ScriptRenderer<'a> {
    manifest: &'a Manifest,
    options: &'a RenderOptions,
}

impl<'a> ScriptRenderer<'a> {
    pub fn new(manifest: &'a Manifest, options: &'a RenderOptions) -> Self {
        Self { manifest, options }
    }

    /// Select the render path. A declared Dockerfile wins over `image`.
    pub fn mode(&self) -> RenderMode {
        if let Some(dockerfile_path) = self.manifest.dockerfile_path() {
            return RenderMode::Dockerfile { dockerfile_path };
        }
        let base_image = match self.manifest.base_image(&self.options.default_base_image) {
            BaseImage::Image(image) | BaseImage::Default(image) => image,
            // unreachable without a Dockerfile path; fall back to the default
            BaseImage::DeferredToDockerfile => self.options.default_base_image.clone(),
        };
        RenderMode::Image { base_image }
    }

    /// Render the build script, reading the user's Dockerfile relative to
    /// `repo_root` when the manifest declares one.
    #[instrument(skip_all, fields(manifest = %self.manifest.path().display()))]
    pub fn render(&self, repo_root: &Path) -> Result<RenderedScript> {
        match self.mode() {
            RenderMode::Image { base_image } => Ok(self.render_image_mode(&base_image)),
            RenderMode::Dockerfile { dockerfile_path } => {
                let content = read_dockerfile(repo_root, &dockerfile_path)?;
                Ok(self.render_dockerfile_mode(&dockerfile_path, &content))
            }
        }
    }

    /// Render a complete script on top of `base_image`.
    pub fn render_image_mode(&self, base_image: &str) -> RenderedScript {
        info!("Rendering image mode build script from {}", base_image);
        let mut fragments = Fragments::new(self.manifest, self.options);
        let uid = self.options.nb_uid;

        let mut script = String::new();
        script.push_str(&format!("FROM {}\n\n", base_image));
        script.push_str(&locale_and_shell_setup());
        script.push_str(&format!(
            r#"# Notebook user; the hub requires a stable uid
ARG NB_USER={user}
ARG NB_UID={uid}
ENV USER=${{NB_USER}} \
    HOME=/home/${{NB_USER}} \
    NB_USER=${{NB_USER}} \
    NB_UID=${{NB_UID}}

"#,
            user = self.options.nb_user,
            uid = uid,
        ));
        script.push_str(&user_setup(&uid.to_string()));
        script.push_str(&apt_install(&self.options.packages()));
        script.push_str("ENV PATH=${HOME}/.local/bin:$PATH\n\n");
        script.push_str(&virtual_env_setup(&uid.to_string()));
        script.push_str(&format!("EXPOSE {}\n\n", NOTEBOOK_PORT));
        script.push_str(&fragments.container_env());
        script.push_str(&format!(
            r#"ARG REPO_DIR=${{HOME}}
ENV REPO_DIR=${{REPO_DIR}}
WORKDIR ${{REPO_DIR}}

COPY --chown={uid}:{uid} . ${{REPO_DIR}}/

USER ${{NB_USER}}

"#,
            uid = uid,
        ));
        script.push_str(&runtime_install());
        script.push_str(&fragments.extensions());
        script.push_str(&fragments.lifecycle_commands());
        script.push_str(&fragments.remote_env());
        script.push_str(&entrypoint());

        fragments.finish(
            RenderMode::Image {
                base_image: base_image.to_string(),
            },
            script,
        )
    }

    /// Append the invariant block to a user Dockerfile's content.
    ///
    /// `content` is copied unmodified; a newline is added only when it does
    /// not already end with one.
    pub fn render_dockerfile_mode(&self, dockerfile: &Path, content: &str) -> RenderedScript {
        info!(
            "Rendering Dockerfile mode build script extending {}",
            dockerfile.display()
        );
        let mut fragments = Fragments::new(self.manifest, self.options);

        let mut script = String::with_capacity(content.len() + 2048);
        script.push_str(content);
        if !content.is_empty() && !content.ends_with('\n') {
            script.push('\n');
        }
        script.push('\n');
        script.push_str(APPENDED_BLOCK_MARKER);
        script.push_str("\n\n");
        script.push_str(&format!(
            r#"USER root

ARG NB_USER={user}
ARG NB_UID={uid}
ENV USER=${{NB_USER}} \
    HOME=/home/${{NB_USER}}

"#,
            user = self.options.nb_user,
            uid = self.options.nb_uid,
        ));
        script.push_str(&user_setup("${NB_UID}"));
        script.push_str(
            r#"# Python for the single-user server
RUN if command -v apt-get > /dev/null 2>&1; then \
        apt-get -qq update && \
        apt-get -qq install --yes --no-install-recommends \
            python3 python3-pip python3-venv > /dev/null && \
        apt-get -qq purge && apt-get -qq clean && \
        rm -rf /var/lib/apt/lists/*; \
    fi

"#,
        );
        script.push_str(&virtual_env_setup("${NB_UID}"));
        script.push_str(&fragments.container_env());
        script.push_str("USER ${NB_USER}\n\n");
        script.push_str(&runtime_install());
        script.push_str(&fragments.extensions());
        script.push_str(&format!(
            r#"ARG REPO_DIR=${{HOME}}
ENV REPO_DIR=${{REPO_DIR}}
WORKDIR ${{REPO_DIR}}

EXPOSE {port}

"#,
            port = NOTEBOOK_PORT,
        ));
        script.push_str(&entrypoint());
        script.push_str(&fragments.lifecycle_commands());
        script.push_str(&fragments.remote_env());

        fragments.finish(
            RenderMode::Dockerfile {
                dockerfile_path: dockerfile.to_path_buf(),
            },
            script,
        )
    }
}

/// Manifest-derived fragments plus the warnings produced while building them.
struct Fragments<'a> {
    manifest: &'a Manifest,
    options: &'a RenderOptions,
    plan: ExtensionPlan,
    warnings: Vec<String>,
}

impl<'a> Fragments<'a> {
    fn new(manifest: &'a Manifest, options: &'a RenderOptions) -> Self {
        let plan = map_extensions(manifest.extensions(), &options.extension_tables);
        let mut warnings = plan.warnings.clone();

        for feature in manifest.features() {
            let message = format!(
                "Feature '{}' is declared but features are not installed by this build",
                feature
            );
            warn!("{}", message);
            warnings.push(message);
        }
        if !manifest.update_content_command().is_absent() {
            debug!("updateContentCommand is accepted but not rendered");
        }

        Self {
            manifest,
            options,
            plan,
            warnings,
        }
    }

    fn container_env(&mut self) -> String {
        let lines = self.env_lines(self.manifest.container_env(), "containerEnv");
        if lines.is_empty() {
            return String::new();
        }
        format!("# Environment from containerEnv\n{}\n", lines)
    }

    fn remote_env(&mut self) -> String {
        let lines = self.env_lines(self.manifest.remote_env(), "remoteEnv");
        if lines.is_empty() {
            return String::new();
        }
        format!("# Environment from remoteEnv\n{}\n", lines)
    }

    fn env_lines(&mut self, env: &IndexMap<String, String>, field: &str) -> String {
        let mut lines = String::new();
        for (key, value) in env {
            if !is_valid_env_key(key) {
                let message = format!(
                    "{} variable '{}' has an invalid name and was skipped",
                    field, key
                );
                warn!("{}", message);
                self.warnings.push(message);
                continue;
            }
            lines.push_str(&format!("ENV {}\n", format_env_var(key, value)));
        }
        lines
    }

    fn extensions(&self) -> String {
        if !self.options.install_extensions || self.plan.is_empty() {
            return String::new();
        }

        let uid = self.options.nb_uid;
        let mut block = format!(
            r#"# Editor extensions from customizations.vscode.extensions
USER root
RUN curl -fsSL https://code-server.dev/install.sh | \
        sh -s -- --method=standalone --prefix={prefix} && \
    chown -R {uid}:{uid} {prefix}
USER ${{NB_USER}}
RUN {prefix}/bin/code-server --extensions-dir {prefix}/extensions"#,
            prefix = CODE_SERVER_PREFIX,
            uid = uid,
        );
        for id in &self.plan.install {
            block.push_str(&format!(
                " \\\n        --install-extension {}",
                shell_words::quote(id)
            ));
        }
        block.push_str("\n\n");
        block
    }

    fn lifecycle_commands(&self) -> String {
        let mut block = String::new();
        let commands = [
            ("onCreateCommand", self.manifest.on_create_command()),
            ("postCreateCommand", self.manifest.post_create_command()),
        ];
        for (field, spec) in commands {
            if let Some(instruction) = run_instruction(spec) {
                debug!("Rendering {}", field);
                block.push_str(&format!("# {}\n", field));
                block.push_str(&instruction);
                block.push('\n');
            }
        }
        block
    }

    fn finish(self, mode: RenderMode, dockerfile: String) -> RenderedScript {
        RenderedScript {
            mode,
            manifest_path: self.manifest.path().to_path_buf(),
            dockerfile,
            warnings: self.warnings,
            build_args: self.manifest.build_args(),
            extensions: self.plan,
        }
    }
}

fn locale_and_shell_setup() -> String {
    r#"# Avoid prompts from apt
ENV DEBIAN_FRONTEND=noninteractive

# Set up locales
RUN apt-get -qq update && \
    apt-get -qq install --yes --no-install-recommends locales > /dev/null && \
    apt-get -qq purge && \
    apt-get -qq clean && \
    rm -rf /var/lib/apt/lists/*

RUN echo "en_US.UTF-8 UTF-8" > /etc/locale.gen && \
    locale-gen

ENV LC_ALL=en_US.UTF-8 \
    LANG=en_US.UTF-8 \
    LANGUAGE=en_US.UTF-8

# Use bash as default shell
ENV SHELL=/bin/bash

"#
    .to_string()
}

/// Create the notebook user with uid and gid `uid` unless the base image
/// already has it. An existing group with that gid is reused and the uid may
/// be shared with another account, as on images shipping `ubuntu` or `vscode`
/// at 1000.
fn user_setup(uid: &str) -> String {
    format!(
        r#"# Create the notebook user unless the base image already has it
RUN if ! id -u ${{NB_USER}} > /dev/null 2>&1; then \
        (getent group {uid} > /dev/null || groupadd --gid {uid} ${{NB_USER}}) && \
        useradd --comment "Default user" --create-home --gid {uid} \
                --no-log-init --non-unique --shell /bin/bash --uid {uid} ${{NB_USER}}; \
    fi

"#,
        uid = uid,
    )
}

fn apt_install(packages: &BTreeSet<&str>) -> String {
    let mut block = String::from(
        "# Base packages\nRUN apt-get -qq update && \\\n    apt-get -qq install --yes --no-install-recommends \\\n",
    );
    for package in packages {
        block.push_str(&format!("        {} \\\n", package));
    }
    block.push_str(
        "        > /dev/null && \\\n    apt-get -qq purge && \\\n    apt-get -qq clean && \\\n    rm -rf /var/lib/apt/lists/*\n\n",
    );
    block
}

fn virtual_env_setup(owner: &str) -> String {
    format!(
        r#"# Virtual environment outside /home, which the hub bind-mounts over
ENV VIRTUAL_ENV={venv}
RUN python3 -m venv ${{VIRTUAL_ENV}} && \
    chown -R {owner}:{owner} ${{VIRTUAL_ENV}}
ENV PATH=${{VIRTUAL_ENV}}/bin:$PATH

"#,
        venv = VENV_PATH,
        owner = owner,
    )
}

fn runtime_install() -> String {
    let mut block = String::from(
        "# Single-user server runtime, installed into the virtual environment\nRUN pip install --no-cache-dir",
    );
    for package in RUNTIME_PYTHON_PACKAGES {
        block.push_str(&format!(" \\\n    {}", package));
    }
    block.push_str("\n\n");
    block
}

fn entrypoint() -> String {
    format!(
        "# The hub normally supplies the start command; this is the standalone fallback\nCMD [\"jupyterhub-singleuser\", \"--ip=0.0.0.0\", \"--port={}\"]\n",
        NOTEBOOK_PORT
    )
}

/// `RUN` instruction for a command, or `None` when there is nothing to run.
///
/// Commands whose text fits on single lines use shell form; named commands
/// start on the line after `RUN \` so their `# name` lines stay inside the
/// continuation. Anything carrying its own line breaks is written in exec
/// form, where the JSON string keeps them out of the Dockerfile's line
/// structure.
fn run_instruction(spec: &CommandSpec) -> Option<String> {
    let command = spec.normalize()?;
    if !spec.is_single_line() {
        debug!("Command spans several lines, using exec form");
        return Some(format!(
            "RUN [\"/bin/sh\", \"-c\", {}]\n",
            serde_json::Value::String(command)
        ));
    }
    if command.contains('\n') {
        Some(format!("RUN \\\n{}\n", command))
    } else {
        Some(format!("RUN {}\n", command))
    }
}

/// Read the user's Dockerfile, refusing paths that resolve outside
/// `repo_root`.
fn read_dockerfile(repo_root: &Path, dockerfile: &Path) -> Result<String> {
    let outside = || RenderError::DockerfileOutsideRepository {
        path: dockerfile.to_path_buf(),
    };
    let unreadable = |source| RenderError::DockerfileUnreadable {
        path: dockerfile.to_path_buf(),
        source,
    };

    let lexically_inside = dockerfile
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !lexically_inside {
        return Err(outside().into());
    }

    // symlinks inside the repository may still point elsewhere
    let root = repo_root.canonicalize().map_err(unreadable)?;
    let resolved = repo_root.join(dockerfile).canonicalize().map_err(unreadable)?;
    if !resolved.starts_with(&root) {
        return Err(outside().into());
    }

    debug!("Reading user Dockerfile {}", resolved.display());
    let content = std::fs::read_to_string(&resolved).map_err(unreadable)?;
    Ok(content)
}

/// Format an environment variable for an `ENV` instruction.
///
/// The build substitutes `$VAR` and `${VAR}` references in the value, so
/// `"PATH": "/opt/tools/bin:${PATH}"` extends the image's `PATH`. A literal
/// dollar sign is written `\$` in the manifest and kept escaped here.
fn format_env_var(key: &str, value: &str) -> String {
    let mut escaped_value = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'$') => escaped_value.push('\\'),
            '\\' => escaped_value.push_str("\\\\"),
            '"' => escaped_value.push_str("\\\""),
            '\n' => escaped_value.push_str("\\n"),
            '\r' => escaped_value.push_str("\\r"),
            other => escaped_value.push(other),
        }
    }
    format!("{}=\"{}\"", key, escaped_value)
}

fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('=') && !key.chars().any(char::is_whitespace)
}
