//! Persisted cursor offsets
//!
//! A cursor serialized here is the durable resume position of an extraction
//! stream. The JSON shape is a compatibility contract: field order, camelCase
//! names, and explicit `null` for absent session state all stay fixed so that
//! offsets written by earlier runs (or by other implementations of the same
//! contract) keep deserializing.
//!
//! Example of a fresh offset:
//! ```json
//! {"index":"orders","cursorFields":[{"field":"updated_at","initialValue":0}],
//!  "pitId":null,"sortValues":null,"runningDocumentCount":0,"scrollLimit":0}
//! ```

use crate::elastic::{Cursor, ElasticError};
use eyre::{Context, Result};
use std::path::{Path, PathBuf};

/// Serializes cursors to their persisted JSON form and back.
///
/// A string produced by [`CursorSerde::serialize`] always deserializes to an
/// equal cursor. Deserialization failure is fatal: a corrupt offset must
/// surface as an error, never silently restart the stream from the beginning.
pub struct CursorSerde;

impl CursorSerde {
    /// Render a cursor as its persisted JSON string.
    pub fn serialize(cursor: &Cursor) -> Result<String, ElasticError> {
        Ok(serde_json::to_string(cursor)?)
    }

    /// Parse a persisted JSON string back into a cursor.
    pub fn deserialize(offset: &str) -> Result<Cursor, ElasticError> {
        Ok(serde_json::from_str(offset)?)
    }
}

/// Single-file offset store.
///
/// Writes go through a sibling temp file and a rename, so a crash mid-write
/// leaves the previous offset intact rather than a truncated file.
pub struct OffsetStore {
    path: PathBuf,
}

impl OffsetStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the offset file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an offset has been persisted.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the persisted cursor, or `None` when no offset exists yet.
    pub fn read(&self) -> Result<Option<Cursor>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let cursor = CursorSerde::deserialize(&content).with_context(|| {
                    format!("Failed to parse offset file: {}", self.path.display())
                })?;
                Ok(Some(cursor))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read offset file: {}", self.path.display())),
        }
    }

    /// Persist a cursor, replacing any previous offset atomically.
    pub fn write(&self, cursor: &Cursor) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create offset directory: {}", parent.display())
            })?;
        }

        let offset = CursorSerde::serialize(cursor)
            .with_context(|| format!("Failed to serialize offset for '{}'", cursor.index))?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, offset)
            .with_context(|| format!("Failed to write offset file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace offset file: {}", self.path.display()))?;

        Ok(())
    }

    /// Delete the persisted offset.
    ///
    /// Returns true if an offset was deleted, false if none existed.
    pub fn delete(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to delete offset file: {}", self.path.display())),
        }
    }
}
