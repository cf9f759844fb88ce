//! Elastic Index Tailer
//!
//! An incremental export tool for Elasticsearch indices: documents stream out
//! page by page through a point in time session, and a persisted cursor
//! offset lets any run resume exactly where the previous one stopped.

pub mod cli;
pub mod client;
pub mod elastic;
pub mod etl;
pub mod storage;
pub mod transform;

// Re-exports for convenience
pub use client::{Auth, ElasticClient};
pub use elastic::{
    Cursor, CursorField, CursorValue, ElasticError, ElasticRepository, IndexExtractor, Page,
    RetryPolicy,
};
pub use etl::{Extractor, Loader, Pipeline, Transformer};
pub use storage::{CursorSerde, ExportManifest, NdjsonReader, NdjsonWriter, OffsetStore};
pub use transform::FieldSelector;
