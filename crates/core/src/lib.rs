//! Core library for hubpack
//!
//! Compiles a devcontainer manifest (JSON with comments) into a Dockerfile
//! that a JupyterHub deployment can launch: manifest discovery, comment
//! stripping, manifest extraction, lifecycle command normalization, editor
//! extension mapping and build script rendering, plus logging and error
//! handling shared with the CLI.

pub mod command;
pub mod compiler;
pub mod discovery;
pub mod errors;
pub mod extensions;
pub mod io;
pub mod jsonc;
pub mod logging;
pub mod manifest;
pub mod render;
pub mod settings;

// Re-export IndexMap for use by dependent crates (preserves insertion order for ordered maps)
pub use indexmap::IndexMap;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
