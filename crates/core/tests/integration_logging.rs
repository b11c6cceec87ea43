//! Integration tests for logging initialization
//!
//! Logging can only be installed once per process, so these tests focus on
//! repeated initialization being safe and on the pipeline running with a
//! subscriber active.

use hubpack_core::{compiler::Compiler, logging, render::RenderOptions};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

#[test]
#[serial]
fn test_hubpack_log_environment_variable() {
    std::env::set_var("HUBPACK_LOG", "trace");

    let result = logging::init(None);
    assert!(result.is_ok());

    std::env::remove_var("HUBPACK_LOG");
}

#[test]
#[serial]
fn test_logging_initialization_safety() {
    assert!(logging::init(Some("text")).is_ok());
    assert!(logging::init(Some("json")).is_ok());
    assert!(logging::is_initialized());
}

#[test]
#[serial]
fn test_render_with_debug_logging() {
    std::env::set_var("HUBPACK_LOG", "debug");
    let _ = logging::init(None);
    std::env::remove_var("HUBPACK_LOG");

    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("devcontainer.json"),
        r#"{"image": "ubuntu:22.04", "unknownField": 1, "features": {"x:1": {}}}"#,
    )
    .unwrap();

    let compiler = Compiler::detect(tmp.path(), RenderOptions::default()).unwrap();
    let rendered = compiler.render().unwrap();
    assert_eq!(rendered.warnings.len(), 1);
}
