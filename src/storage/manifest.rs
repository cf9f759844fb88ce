//! Export manifest management
//!
//! The export manifest is stored as `export.yml` and describes one extraction
//! stream: the target index, the composite sort key with its starting bounds,
//! and the paging/retry tuning.
//!
//! Example format:
//! ```yaml
//! elasticsearch:
//!   version: 8.11.4
//! index: orders
//! cursor_fields:
//!   - field: updated_at
//!     initial_value: 0
//!   - field: id
//!     initial_value: ""
//! page_size: 1000
//! pit_keep_alive_seconds: 120
//! fields:
//!   - order_id
//!   - amount
//! ```
//!
//! Everything except `index` and `cursor_fields` is optional and falls back
//! to the engine defaults.

use crate::elastic::{
    Cursor, CursorField, CursorValue, DEFAULT_MAX_ATTEMPTS, DEFAULT_PAGE_SIZE,
    DEFAULT_PIT_KEEP_ALIVE_SECONDS, DEFAULT_RETRY_BACKOFF_MILLIS,
};
use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One sort key entry: field name and the lower bound extraction starts from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldEntry {
    pub field: String,
    pub initial_value: CursorValue,
}

impl FieldEntry {
    pub fn new(field: impl Into<String>, initial_value: impl Into<CursorValue>) -> Self {
        Self {
            field: field.into(),
            initial_value: initial_value.into(),
        }
    }
}

/// Elasticsearch metadata captured for this export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElasticsearchMetadata {
    /// Full version string from the root endpoint (e.g., "8.11.4")
    pub version: String,
}

impl ElasticsearchMetadata {
    pub fn new(version: String) -> Self {
        Self { version }
    }
}

/// Export manifest structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportManifest {
    /// Optional Elasticsearch metadata recorded at export time
    #[serde(default)]
    pub elasticsearch: Option<ElasticsearchMetadata>,
    /// Index to extract from
    pub index: String,
    /// Composite sort key, in priority order
    pub cursor_fields: Vec<FieldEntry>,
    /// Documents per page
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Point-in-time session keep-alive
    #[serde(default = "default_pit_keep_alive_seconds")]
    pub pit_keep_alive_seconds: u64,
    /// Attempts per remote call before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between retry attempts
    #[serde(default = "default_retry_backoff_millis")]
    pub retry_backoff_millis: u64,
    /// Optional projection: only these document fields are exported
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_pit_keep_alive_seconds() -> u64 {
    DEFAULT_PIT_KEEP_ALIVE_SECONDS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_backoff_millis() -> u64 {
    DEFAULT_RETRY_BACKOFF_MILLIS
}

impl ExportManifest {
    /// Create a manifest for an index with engine defaults
    pub fn new(index: impl Into<String>, cursor_fields: Vec<FieldEntry>) -> Self {
        Self {
            elasticsearch: None,
            index: index.into(),
            cursor_fields,
            page_size: DEFAULT_PAGE_SIZE,
            pit_keep_alive_seconds: DEFAULT_PIT_KEEP_ALIVE_SECONDS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_millis: DEFAULT_RETRY_BACKOFF_MILLIS,
            fields: None,
        }
    }

    /// Set Elasticsearch version metadata
    pub fn set_elasticsearch_version(&mut self, version: impl Into<String>) {
        self.elasticsearch = Some(ElasticsearchMetadata::new(version.into()));
    }

    /// Get Elasticsearch version metadata if present
    pub fn elasticsearch_version(&self) -> Option<&str> {
        self.elasticsearch.as_ref().map(|e| e.version.as_str())
    }

    /// Build the starting cursor this manifest describes
    pub fn cursor(&self) -> Cursor {
        let fields = self
            .cursor_fields
            .iter()
            .map(|entry| CursorField::new(entry.field.clone(), entry.initial_value.clone()))
            .collect();
        Cursor::of(self.index.clone(), fields)
    }

    /// Check the manifest is usable before any remote call
    pub fn validate(&self) -> Result<()> {
        if self.index.trim().is_empty() {
            bail!("Manifest has no index");
        }
        if self.cursor_fields.is_empty() {
            bail!("Manifest for '{}' has no cursor fields", self.index);
        }
        if let Some(entry) = self.cursor_fields.iter().find(|e| e.field.trim().is_empty()) {
            bail!(
                "Manifest for '{}' has a cursor field with an empty name (initial value: {})",
                self.index,
                entry.initial_value
            );
        }
        if let Some(fields) = &self.fields
            && fields.iter().any(|f| f.trim().is_empty())
        {
            bail!("Manifest for '{}' has an empty entry in 'fields'", self.index);
        }
        Ok(())
    }

    /// Read manifest from YAML file
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read export manifest: {}",
                path.as_ref().display()
            )
        })?;

        let manifest: Self = serde_yaml::from_str(&content)
            .with_context(|| "Failed to parse export manifest YAML")?;

        Ok(manifest)
    }

    /// Write manifest to YAML file
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)
            .with_context(|| "Failed to serialize export manifest to YAML")?;

        std::fs::write(path.as_ref(), yaml).with_context(|| {
            format!(
                "Failed to write export manifest: {}",
                path.as_ref().display()
            )
        })?;

        Ok(())
    }
}
