//! Elasticsearch cursor pagination
//!
//! The extraction core: the [`Cursor`] resume-state model, range-query
//! construction, the [`ElasticRepository`] engine driving point-in-time
//! sessions with retry and expiry recovery, and the [`IndexExtractor`]
//! adapter that feeds pages into an ETL pipeline. Everything here talks to
//! the store through the [`DocumentStore`] trait, never to HTTP directly.

mod cursor;
mod error;
mod extractor;
mod page;
mod query;
mod repository;
mod retry;
mod store;

pub use cursor::{Cursor, CursorField, CursorValue};
pub use error::ElasticError;
pub use extractor::IndexExtractor;
pub use page::{ID_FIELD, INDEX_FIELD, Page};
pub use repository::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_PAGE_SIZE, DEFAULT_PIT_KEEP_ALIVE_SECONDS,
    DEFAULT_RETRY_BACKOFF_MILLIS, ElasticRepository, MIN_PIT_KEEP_ALIVE_SECONDS,
};
pub use retry::RetryPolicy;
pub use store::{DocumentStore, Hit, Hits, SearchResponse};
