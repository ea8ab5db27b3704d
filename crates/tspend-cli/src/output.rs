// crates/tspend-cli/src/output.rs
//
// Output formatting utilities for the tspend CLI.
// Supports text (with tables) and JSON output modes.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use tabled::{Table, Tabled};

use tspend_core::TspendError;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable text and tables (default).
    Text,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> Result<String, TspendError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Write `text` plus a trailing newline to `path`, or to stdout when no
/// path is given.
pub fn write_out(path: Option<&Path>, text: &str) -> Result<(), TspendError> {
    match path {
        Some(path) => fs::write(path, format!("{}\n", text)).map_err(|e| {
            TspendError::Io(format!("error creating output file {}: {}", path.display(), e))
        }),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", text)?;
            Ok(())
        }
    }
}
