//! Inspect command implementation
//!
//! Implements `hubpack inspect`: print the model extracted from the manifest
//! (render mode, filtered environment, normalized lifecycle commands and
//! extension decisions) without rendering a Dockerfile.

use crate::commands::{CompileArgs, RenderOverrides};
use anyhow::Result;
use hubpack_core::extensions::{map_extensions, ExtensionPlan};
use hubpack_core::io::Output;
use hubpack_core::render::RenderMode;
use hubpack_core::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use tracing::instrument;

/// Normalized lifecycle commands; `None` means nothing to run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectCommands {
    pub on_create_command: Option<String>,
    pub post_create_command: Option<String>,
    /// Accepted but never rendered
    pub update_content_command: Option<String>,
}

/// JSON output of `hubpack inspect`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub manifest_path: PathBuf,
    pub name: Option<String>,
    #[serde(flatten)]
    pub mode: RenderMode,
    pub build_args: IndexMap<String, String>,
    pub container_env: IndexMap<String, String>,
    pub remote_env: IndexMap<String, String>,
    pub commands: InspectCommands,
    pub extensions: ExtensionPlan,
    pub features: Vec<String>,
}

#[instrument(skip_all)]
pub fn execute_inspect(args: CompileArgs, overrides: RenderOverrides) -> Result<()> {
    let compiler = args.compiler(&overrides)?;
    let manifest = compiler.require_manifest()?;
    let mode = compiler.mode()?;

    let report = InspectReport {
        manifest_path: manifest.path().to_path_buf(),
        name: manifest.name().map(str::to_string),
        mode,
        build_args: manifest.build_args(),
        container_env: manifest.container_env().clone(),
        remote_env: manifest.remote_env().clone(),
        commands: InspectCommands {
            on_create_command: manifest.on_create_command().normalize(),
            post_create_command: manifest.post_create_command().normalize(),
            update_content_command: manifest.update_content_command().normalize(),
        },
        extensions: map_extensions(
            manifest.extensions(),
            &compiler.options().extension_tables,
        ),
        features: manifest.features().to_vec(),
    };

    let mut output = Output::new();
    output.write_json_pretty(&report)?;
    output.flush()?;
    Ok(())
}
