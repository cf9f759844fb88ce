//! Elasticsearch index extractor
//!
//! Adapts [`ElasticRepository`] to the paged [`Extractor`] trait: each
//! `next_page` call fetches one page and advances the held cursor, so the
//! extractor's position can be persisted after every loaded page.

use super::cursor::Cursor;
use super::repository::ElasticRepository;
use super::store::DocumentStore;
use crate::etl::Extractor;
use eyre::{Context, Result};
use serde_json::Value;

/// Paged extractor over one Elasticsearch index
///
/// Exhaustion latches: once an empty page is seen, `next_page` keeps
/// returning `None` without touching the store until [`rearm`] is called.
/// The cursor keeps its session across the latch, so a re-armed poll is a
/// single cheap search.
///
/// [`rearm`]: IndexExtractor::rearm
pub struct IndexExtractor<S> {
    repository: ElasticRepository<S>,
    cursor: Cursor,
    exhausted: bool,
}

impl<S: DocumentStore> IndexExtractor<S> {
    pub fn new(repository: ElasticRepository<S>, cursor: Cursor) -> Self {
        Self {
            repository,
            cursor,
            exhausted: false,
        }
    }

    /// The extractor's current position: the cursor that resumes after
    /// everything extracted so far.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Clear the exhaustion latch so the next `next_page` polls the store
    /// again. Used by follow mode between polling rounds.
    pub fn rearm(&mut self) {
        self.exhausted = false;
    }

    /// End the stream: release the session and return the detached cursor
    /// to persist as the durable offset.
    pub async fn close(&mut self) -> Cursor {
        self.cursor = self.repository.close_session(&self.cursor).await;
        self.cursor.clone()
    }
}

impl<S: DocumentStore + Send + Sync> Extractor for IndexExtractor<S> {
    type Item = Value;

    async fn next_page(&mut self) -> Result<Option<Vec<Self::Item>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .repository
            .search(&self.cursor)
            .await
            .with_context(|| format!("Failed to fetch page from '{}'", self.cursor.index))?;
        self.cursor = page.cursor;

        match page.documents.is_empty() {
            true => {
                self.exhausted = true;
                Ok(None)
            }
            false => Ok(Some(page.documents)),
        }
    }
}
