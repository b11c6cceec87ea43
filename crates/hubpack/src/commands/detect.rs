//! Detect command implementation
//!
//! Implements `hubpack detect`: report whether the repository carries a
//! devcontainer manifest, and where.

use crate::cli::OutputFormat;
use crate::commands::{CompileArgs, ExitCode};
use anyhow::Result;
use hubpack_core::io::Output;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, instrument};

/// JSON output of `hubpack detect`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResult {
    pub applies: bool,
    pub manifest_path: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
}

#[instrument(skip_all)]
pub fn execute_detect(args: CompileArgs, output_format: OutputFormat) -> Result<()> {
    let locator = args.locator()?;
    let manifest_path = locator.locate();
    let result = DetectResult {
        applies: manifest_path.is_some(),
        manifest_path,
        config_dir: locator.config_dir().map(PathBuf::from),
    };

    let mut output = Output::new();
    match output_format {
        OutputFormat::Json => output.write_json(&result)?,
        OutputFormat::Text => {
            if let Some(path) = &result.manifest_path {
                output.write_line(&path.display().to_string())?;
            }
        }
    }
    output.flush()?;

    if !result.applies {
        info!(
            "No devcontainer manifest found in {}",
            locator.repo_root().display()
        );
        return Err(ExitCode(1).into());
    }
    Ok(())
}
