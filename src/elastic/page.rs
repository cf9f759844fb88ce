//! Search result pages
//!
//! A [`Page`] couples one batch of exported documents with the [`Cursor`]
//! positioned immediately after that batch. Consumers persist the cursor only
//! after the documents are safely handed off, which is what makes the stream
//! at-least-once under crashes.

use super::cursor::Cursor;
use super::store::Hit;
use serde_json::{Map, Value};

/// Synthetic document field carrying the store-assigned id (`_id`).
pub const ID_FIELD: &str = "es-id";
/// Synthetic document field carrying the concrete index a hit came from
/// (`_index`); under aliases this can differ from the index the cursor names.
pub const INDEX_FIELD: &str = "es-index";

/// One page of documents plus the cursor that resumes after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub documents: Vec<Value>,
    pub cursor: Cursor,
}

impl Page {
    pub fn new(documents: Vec<Value>, cursor: Cursor) -> Self {
        Self { documents, cursor }
    }

    /// An empty page signals exhaustion at the cursor's current bounds.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Flatten a hit into the exported document shape: the `_source` object with
/// [`ID_FIELD`] and [`INDEX_FIELD`] added. Source fields with those names are
/// overwritten. A hit without a source body still yields the two synthetic
/// fields.
pub fn document_from_hit(hit: Hit) -> Value {
    let mut document = match hit.source {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    document.insert(ID_FIELD.to_string(), Value::from(hit.id));
    document.insert(INDEX_FIELD.to_string(), Value::from(hit.index));
    Value::Object(document)
}
