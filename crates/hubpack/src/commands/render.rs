//! Render command implementation
//!
//! Implements `hubpack render`: compile the manifest and write the Dockerfile
//! (text) or the Dockerfile plus metadata (JSON) to stdout or a file.

use crate::cli::OutputFormat;
use crate::commands::{CompileArgs, RenderOverrides};
use anyhow::Result;
use hubpack_core::io::Output;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Render command arguments
#[derive(Debug, Clone)]
pub struct RenderArgs {
    pub compile: CompileArgs,
    pub overrides: RenderOverrides,
    pub output_format: OutputFormat,
    pub output: Option<PathBuf>,
}

#[instrument(skip_all)]
pub fn execute_render(args: RenderArgs) -> Result<()> {
    let compiler = args.compile.compiler(&args.overrides)?;
    let rendered = compiler.render()?;

    let mut output = match &args.output {
        Some(path) => Output::create(path)?,
        None => Output::new(),
    };
    match args.output_format {
        OutputFormat::Text => output.write_raw(&rendered.dockerfile)?,
        OutputFormat::Json => output.write_json(&rendered)?,
    }
    output.flush()?;

    if let Some(path) = &args.output {
        info!("Wrote {}", path.display());
    }
    if !rendered.build_args.is_empty() {
        info!(
            "Pass build args to the build engine: {}",
            rendered
                .build_args
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}
