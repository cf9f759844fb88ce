//! NDJSON (Newline Delimited JSON) document sink
//!
//! Exported documents land here one JSON object per line. The writer only
//! ever appends, so a resumed extraction continues the same file the previous
//! run left off; pair it with the offset store, which records how far that
//! file has progressed.

use crate::etl::Loader;

use eyre::{Context, Result};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

/// Read NDJSON from a file
pub struct NdjsonReader {
    path: std::path::PathBuf,
}

impl NdjsonReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read all lines as JSON values, skipping blank lines
    pub fn read(&self) -> Result<Vec<Value>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read NDJSON file: {}", self.path.display()))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse JSON line: {}", line))
            })
            .collect()
    }
}

/// Append-only NDJSON writer
pub struct NdjsonWriter {
    path: std::path::PathBuf,
}

impl NdjsonWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append items to the file, creating it if needed.
    pub fn append(&self, items: &[Value]) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open NDJSON file: {}", self.path.display()))?;

        for item in items {
            writeln!(file, "{}", serde_json::to_string(item)?)
                .with_context(|| format!("Failed to write NDJSON file: {}", self.path.display()))?;
        }

        Ok(())
    }

    /// Truncate the file to empty, for starting an export over from scratch.
    pub fn truncate(&self) -> Result<()> {
        std::fs::write(&self.path, "")
            .with_context(|| format!("Failed to truncate NDJSON file: {}", self.path.display()))
    }
}

// Each extracted page becomes one batch of appended lines.
impl Loader for NdjsonWriter {
    type Item = Value;

    async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
        self.append(&items)?;
        Ok(items.len())
    }
}
