//! File system storage operations
//!
//! This module handles all file I/O operations including:
//! - NDJSON document sink reading/writing
//! - Persisted cursor offsets
//! - Export manifest management

mod manifest;
mod ndjson;
mod offsets;

pub use manifest::{ElasticsearchMetadata, ExportManifest, FieldEntry};
pub use ndjson::{NdjsonReader, NdjsonWriter};
pub use offsets::{CursorSerde, OffsetStore};
