use crate::commands::{CompileArgs, RenderOverrides};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// hubpack subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report whether the repository has a devcontainer manifest
    #[command(long_about = "Report whether the repository has a devcontainer manifest\n\n\
        Prints the repository-relative manifest path and exits 0 when one is found; \
        exits 1 without output otherwise.")]
    Detect {
        /// Output format (text or json)
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Render the JupyterHub-compatible Dockerfile
    Render {
        /// Output format (text prints the Dockerfile, json wraps it with metadata)
        #[arg(long, value_enum, default_value = "text")]
        output_format: OutputFormat,
        /// Write output to this file instead of stdout
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
        #[command(flatten)]
        overrides: RenderOverrides,
    },

    /// Show what hubpack extracted from the manifest, as JSON
    Inspect {
        #[command(flatten)]
        overrides: RenderOverrides,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Compile devcontainer.json into a JupyterHub-ready Dockerfile",
    long_about = "Compile devcontainer.json into a JupyterHub-ready Dockerfile\n\n\
        Reads the repository's devcontainer manifest (JSON with comments) and renders a \
        Dockerfile that keeps the hub's requirements: a notebook user with a stable uid, \
        a virtual environment under /opt, port 8888 and a jupyterhub-singleuser entrypoint.",
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via HUBPACK_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Repository root (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Configuration subdirectory relative to the repository root
    /// (defaults to binder/ or .binder/ when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,

    /// Settings file (can be set via HUBPACK_SETTINGS env var)
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None, // Let logging module check environment variable
        };
        let log_level = self.log_level.as_str();

        // Set environment variable for log level before initializing logging
        if std::env::var_os("HUBPACK_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var(
                "RUST_LOG",
                format!("hubpack={},hubpack_core={}", log_level, log_level),
            );
        }
        hubpack_core::logging::init(log_format)?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        let compile = CompileArgs {
            repo: self.repo,
            config_dir: self.config_dir,
            settings: self.settings,
        };

        match self.command {
            Commands::Detect { output_format } => {
                crate::commands::detect::execute_detect(compile, output_format)
            }
            Commands::Render {
                output_format,
                output,
                overrides,
            } => crate::commands::render::execute_render(crate::commands::render::RenderArgs {
                compile,
                overrides,
                output_format,
                output,
            }),
            Commands::Inspect { overrides } => {
                crate::commands::inspect::execute_inspect(compile, overrides)
            }
        }
    }
}
