use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

fn main() -> Result<()> {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    // Dispatch to CLI handler and handle special exit codes
    match parsed.dispatch() {
        Ok(()) => Ok(()),
        Err(err) => {
            // Commands that only need to signal a status (e.g. detect finding nothing)
            if let Some(exit) = err.downcast_ref::<commands::ExitCode>() {
                std::process::exit(exit.0);
            }

            // Exit code 2 when a render was requested but there is no manifest
            if let Some(hubpack_error) = err.downcast_ref::<hubpack_core::errors::HubpackError>() {
                if hubpack_error.is_manifest_absent() {
                    eprintln!("Error: {}", hubpack_error);
                    std::process::exit(2);
                }
            }

            // For all other errors, return them normally
            Err(err)
        }
    }
}
