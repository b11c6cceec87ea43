//! End-to-end tests for compiling repositories into build scripts
//!
//! Each test lays out a scratch repository on disk and runs the full
//! locate -> parse -> render pipeline through [`Compiler`].

use hubpack_core::compiler::Compiler;
use hubpack_core::errors::{HubpackError, RenderError};
use hubpack_core::render::{RenderMode, RenderOptions, DEFAULT_BASE_IMAGE};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn compile(root: &Path) -> Result<hubpack_core::render::RenderedScript, HubpackError> {
    Compiler::detect(root, RenderOptions::default())
        .expect("Should detect repository layout")
        .render()
}

#[test]
fn test_slim_python_image() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        ".devcontainer/devcontainer.json",
        r#"{"image": "python:3.11-slim"}"#,
    );

    let rendered = compile(tmp.path()).unwrap();
    let script = &rendered.dockerfile;
    assert!(script.contains("FROM python:3.11-slim"));
    assert!(script.contains("/opt/venv"));
    assert!(script.contains("EXPOSE 8888"));
    assert!(script.contains("jupyterhub-singleuser"));
    assert!(script.contains("--uid 1000"));
}

#[test]
fn test_empty_manifest_uses_default_base_image() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".devcontainer.json", "{}");

    let rendered = compile(tmp.path()).unwrap();
    assert_eq!(
        rendered.mode,
        RenderMode::Image {
            base_image: DEFAULT_BASE_IMAGE.to_string()
        }
    );
    assert!(rendered.warnings.is_empty());
    assert!(rendered.build_args.is_empty());
    assert!(!rendered.dockerfile.contains("RUN \\\n#"));
}

#[test]
fn test_jsonc_manifest_with_comments_and_urls() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "devcontainer.json",
        r#"{
    // Image used by the course
    "image": "python:3.12",
    /* Environment
       for notebooks */
    "containerEnv": {
        "DOCS_URL": "https://example.com/docs", // keep the URL intact
        "DATABASE_URL": "postgres://u:p@h:5432/d?sslmode=require"
    }
}"#,
    );

    let script = compile(tmp.path()).unwrap().dockerfile;
    assert!(script.contains("ENV DOCS_URL=\"https://example.com/docs\""));
    assert!(script.contains("ENV DATABASE_URL=\"postgres://u:p@h:5432/d?sslmode=require\""));
}

#[test]
fn test_local_references_filtered() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        ".devcontainer/devcontainer.json",
        r#"{
    "image": "python:3.11",
    "containerEnv": {
        "HOST_HOME": "${localEnv:HOME}",
        "KEEP": "yes",
        "WORKSPACE": "${localWorkspaceFolder}/data"
    },
    "remoteEnv": {
        "HOST_USER": "${localEnv:USER}",
        "EDITOR": "vim"
    }
}"#,
    );

    let script = compile(tmp.path()).unwrap().dockerfile;
    assert!(!script.contains("localEnv"));
    assert!(!script.contains("localWorkspaceFolder"));
    assert!(!script.contains("HOST_HOME"));
    assert!(script.contains("ENV KEEP=\"yes\""));
    assert!(script.contains("ENV EDITOR=\"vim\""));
}

#[test]
fn test_blocked_extension_reported() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        ".devcontainer/devcontainer.json",
        r#"{
    "image": "python:3.11",
    "customizations": {"vscode": {"extensions": ["github.copilot", "some.extension"]}}
}"#,
    );

    let rendered = compile(tmp.path()).unwrap();
    assert_eq!(rendered.extensions.install, vec!["some.extension"]);
    assert_eq!(rendered.warnings.len(), 1);
    assert!(rendered.warnings[0].contains("github.copilot"));
}

#[test]
fn test_dockerfile_mode_appends_to_user_dockerfile() {
    let tmp = TempDir::new().unwrap();
    let user_dockerfile = "FROM mcr.microsoft.com/devcontainers/python:3.11\n\nRUN pip install numpy\n";
    write(
        tmp.path(),
        ".devcontainer/devcontainer.json",
        r#"{
    "build": {"dockerfile": "Dockerfile", "context": "..", "args": {"VARIANT": "3.11"}},
    "postCreateCommand": "pip install -r requirements.txt"
}"#,
    );
    write(tmp.path(), "Dockerfile", user_dockerfile);

    let rendered = compile(tmp.path()).unwrap();
    assert_eq!(
        rendered.mode,
        RenderMode::Dockerfile {
            dockerfile_path: PathBuf::from("Dockerfile")
        }
    );
    assert!(rendered.dockerfile.starts_with(user_dockerfile));
    assert!(rendered.dockerfile.contains("if ! id -u ${NB_USER}"));
    assert!(rendered.dockerfile.contains("EXPOSE 8888"));
    assert!(rendered
        .dockerfile
        .contains("RUN pip install -r requirements.txt"));
    assert_eq!(
        rendered.build_args.get("VARIANT").map(String::as_str),
        Some("3.11")
    );
}

#[test]
fn test_dockerfile_mode_missing_dockerfile() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        ".devcontainer/devcontainer.json",
        r#"{"build": {"dockerfile": "Dockerfile.missing"}}"#,
    );

    let err = compile(tmp.path()).unwrap_err();
    match err {
        HubpackError::Render(RenderError::DockerfileUnreadable { path, .. }) => {
            assert_eq!(path, PathBuf::from(".devcontainer/Dockerfile.missing"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_binder_directory_manifest() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "binder/devcontainer.json", r#"{"image": "binder:1"}"#);
    write(tmp.path(), ".devcontainer/devcontainer.json", r#"{"image": "root:1"}"#);

    let compiler = Compiler::detect(tmp.path(), RenderOptions::default()).unwrap();
    assert_eq!(
        compiler.manifest_path(),
        Some(Path::new("binder/devcontainer.json"))
    );
    assert!(compiler
        .render()
        .unwrap()
        .dockerfile
        .starts_with("FROM binder:1\n"));
}

#[test]
fn test_binder_directory_with_relative_dockerfile() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        ".binder/.devcontainer/devcontainer.json",
        r#"{"build": {"dockerfile": "../Dockerfile"}}"#,
    );
    write(tmp.path(), ".binder/Dockerfile", "FROM debian:bookworm");

    let rendered = compile(tmp.path()).unwrap();
    assert_eq!(
        rendered.mode,
        RenderMode::Dockerfile {
            dockerfile_path: PathBuf::from(".binder/Dockerfile")
        }
    );
    assert!(rendered
        .dockerfile
        .starts_with("FROM debian:bookworm\n\n# --- hubpack"));
}

#[test]
fn test_named_lifecycle_commands_rendered_in_order() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        ".devcontainer.json",
        r#"{
    "onCreateCommand": {"deps": ["pip", "install", "-e", "."], "hooks": "pre-commit install"},
    "postCreateCommand": ["echo", "ready to go"],
    "updateContentCommand": "git pull"
}"#,
    );

    let script = compile(tmp.path()).unwrap().dockerfile;
    let on_create = script
        .find("RUN \\\n# deps\npip install -e . && \\\n# hooks\npre-commit install\n")
        .expect("named onCreateCommand block");
    let post_create = script
        .find("RUN echo 'ready to go'\n")
        .expect("postCreateCommand");
    assert!(on_create < post_create);
    assert!(!script.contains("git pull"));
}

#[test]
fn test_line_breaks_in_lifecycle_commands_do_not_leak() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        ".devcontainer/devcontainer.json",
        r#"{
    "image": "python:3.11",
    "onCreateCommand": ["echo", "a\nUSER root"],
    "postCreateCommand": "pip install -e .\nCOPY / /host"
}"#,
    );

    let script = compile(tmp.path()).unwrap().dockerfile;
    assert!(script.contains(r#"RUN ["/bin/sh", "-c", "echo 'a\nUSER root'"]"#));
    assert!(script.contains(r#"RUN ["/bin/sh", "-c", "pip install -e .\nCOPY / /host"]"#));
    assert!(
        script
            .lines()
            .all(|line| !line.starts_with("USER root'") && !line.starts_with("COPY / /host")),
        "{}",
        script
    );
    assert_eq!(script.lines().filter(|l| l.starts_with("USER root")).count(), 0);
}

#[test]
fn test_dockerfile_outside_repository_rejected() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    write(&repo, ".devcontainer/devcontainer.json", r#"{"build": {"dockerfile": "../../secret.txt"}}"#);
    write(tmp.path(), "secret.txt", "FROM leaked\n");

    let err = compile(&repo).unwrap_err();
    match err {
        HubpackError::Render(RenderError::DockerfileOutsideRepository { path }) => {
            assert_eq!(path, PathBuf::from("../secret.txt"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
