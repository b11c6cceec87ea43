//! Output handling with stdout/stderr separation
//!
//! Commands write their results through [`Output`] instead of `println!`.
//! Results go to stdout (or a file); logs and diagnostics go to stderr via
//! `tracing`. Keeping the two apart lets `hubpack render > Dockerfile` and
//! `hubpack render --output-format json | jq` work with logging enabled.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Result writer.
///
/// # Examples
///
/// ```
/// use hubpack_core::io::Output;
/// use serde_json::json;
///
/// let mut output = Output::with_writer(Vec::new());
/// output.write_json(&json!({"mode": "image"})).unwrap();
/// output.write_line("done").unwrap();
/// ```
pub struct Output {
    writer: Box<dyn Write>,
}

impl Output {
    /// Write to stdout.
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Write to an arbitrary sink.
    pub fn with_writer<W: Write + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Write to `path`, creating or truncating it.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        Ok(Self::with_writer(BufWriter::new(file)))
    }

    /// Write a value as one line of compact JSON.
    pub fn write_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let json_output = serde_json::to_string(value)?;
        self.write_line(&json_output)
    }

    /// Write a value as pretty-printed JSON.
    pub fn write_json_pretty<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let json_output = serde_json::to_string_pretty(value)?;
        self.write_line(&json_output)
    }

    /// Write a text line.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{}", text)?;
        Ok(())
    }

    /// Write several text lines.
    pub fn write_lines(&mut self, lines: &[&str]) -> Result<()> {
        for line in lines {
            self.write_line(line)?;
        }
        Ok(())
    }

    /// Write text exactly as given, without adding a newline.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
