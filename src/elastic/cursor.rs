//! Cursor data model
//!
//! A [`Cursor`] is the full resume state of one extraction stream: the target
//! index and ordered sort keys with their current lower bounds, plus the
//! session-scoped state (point-in-time id and last sort key) that lets the
//! next search continue exactly where the previous page ended.
//!
//! Cursors are immutable snapshots. Every operation that moves the stream
//! forward ([`Cursor::advanced`], [`Cursor::reframe`], [`Cursor::exhausted`])
//! returns a new value, so the previous offset can still be persisted if
//! storing the new one fails.

use super::error::ElasticError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ordering value: a signed 64-bit integer or a string.
///
/// The untagged representation keeps the JSON type of the value intact, which
/// is what makes persisted offsets bit-compatible across restarts: integers
/// stay integers (the full i64 range, including `i64::MAX`) and strings stay
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CursorValue {
    Int(i64),
    Str(String),
}

impl CursorValue {
    /// Convert to a `serde_json::Value` for query construction.
    pub fn as_json(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::from(s.as_str()),
        }
    }

    /// Read a cursor value back out of a JSON value.
    ///
    /// Returns `None` for anything that is not an in-range integer or a
    /// string; sort keys of other types cannot participate in a resumable
    /// cursor.
    pub fn from_json(value: &Value) -> Option<Self> {
        if let Some(i) = value.as_i64() {
            Some(Self::Int(i))
        } else {
            value.as_str().map(|s| Self::Str(s.to_string()))
        }
    }
}

impl From<i64> for CursorValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for CursorValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for CursorValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl std::fmt::Display for CursorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

/// One sort key of the composite cursor: a field name and its current lower
/// bound.
///
/// Ordering priority is positional: the first field is the primary sort key,
/// later fields break ties among documents with equal earlier values.
/// `initial_value` starts as the externally-supplied lower bound and is
/// rewritten to the last returned document's value as pages are consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorField {
    pub field: String,
    pub initial_value: CursorValue,
}

impl CursorField {
    pub fn new(field: impl Into<String>, initial_value: impl Into<CursorValue>) -> Self {
        Self {
            field: field.into(),
            initial_value: initial_value.into(),
        }
    }
}

/// Full resume state of one extraction stream.
///
/// Field order matters: serialization follows declaration order, and the
/// resulting JSON shape is a compatibility contract with previously persisted
/// offsets (see `storage::offsets`). Absent options serialize as explicit
/// `null`, never omitted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// Target index name.
    pub index: String,
    /// Ordered sort keys; never empty, never reordered.
    pub cursor_fields: Vec<CursorField>,
    /// Open point-in-time handle, present only while a session is open.
    pub pit_id: Option<String>,
    /// Literal sort key of the last returned document, passed verbatim to
    /// search-after. Opaque: under a point-in-time the store appends its own
    /// shard tie-break, so this may be longer than `cursor_fields`.
    pub sort_values: Option<Vec<CursorValue>>,
    /// Total documents consumed by this stream. Only ever increases.
    pub running_document_count: u64,
    /// Number of times the session has been reframed; a proxy for
    /// pagination instability.
    pub scroll_limit: u64,
}

impl Cursor {
    /// Create a fresh cursor for an index from externally-supplied field
    /// bounds. Querying it opens a new session and applies only the per-field
    /// lower bounds, inclusively.
    pub fn of(index: impl Into<String>, cursor_fields: Vec<CursorField>) -> Self {
        Self {
            index: index.into(),
            cursor_fields,
            pit_id: None,
            sort_values: None,
            running_document_count: 0,
            scroll_limit: 0,
        }
    }

    /// A cursor that has no session state at all: it has never been queried,
    /// or it was reframed.
    pub fn is_fresh(&self) -> bool {
        self.pit_id.is_none() && self.sort_values.is_none()
    }

    /// Whether a session-expiry error on this cursor is recoverable by
    /// reframing. A reframed cursor is not scrollable, which is what limits
    /// recovery to a single attempt per search.
    pub fn is_scrollable(&self) -> bool {
        self.pit_id.is_some() || self.sort_values.is_some()
    }

    /// Whether the per-field range filters should include their lower bound.
    ///
    /// Inclusive while nothing has been consumed (the supplied initial bounds
    /// belong to the stream) and while a search-after position exists (there
    /// the filter is only a coarse guard and must not cut documents tied with
    /// the last key; search-after is the authoritative position). Exclusive
    /// exactly when resuming by value without a session tie-break, which is
    /// what prevents re-delivery of the last consumed document.
    pub fn include_lower_bound(&self) -> bool {
        self.running_document_count == 0 || self.sort_values.is_some()
    }

    /// Same cursor with a (possibly refreshed) point-in-time handle.
    pub fn with_pit_id(&self, pit_id: impl Into<String>) -> Self {
        Self {
            pit_id: Some(pit_id.into()),
            ..self.clone()
        }
    }

    /// Advance past a consumed page.
    ///
    /// `sort_values` is the last document's literal sort key as returned by
    /// the store and must cover every cursor field; its first N positions
    /// rewrite the N field bounds (the store echoes the indexed key, so
    /// integer/string typing is preserved) and the whole array is kept
    /// verbatim for search-after resume.
    pub fn advanced(&self, sort_values: Vec<CursorValue>, page_len: u64) -> Self {
        let cursor_fields = self
            .cursor_fields
            .iter()
            .zip(sort_values.iter())
            .map(|(field, value)| CursorField {
                field: field.field.clone(),
                initial_value: value.clone(),
            })
            .collect();

        Self {
            index: self.index.clone(),
            cursor_fields,
            pit_id: self.pit_id.clone(),
            sort_values: Some(sort_values),
            running_document_count: self.running_document_count + page_len,
            scroll_limit: self.scroll_limit,
        }
    }

    /// Discard the session: clear the point-in-time handle and the
    /// search-after position, count the reframe. Field bounds are left
    /// unchanged because no document past the last confirmed one was lost.
    pub fn reframe(&self) -> Self {
        Self {
            pit_id: None,
            sort_values: None,
            scroll_limit: self.scroll_limit + 1,
            ..self.clone()
        }
    }

    /// The empty-page variant: the stream is exhausted at the current bounds.
    ///
    /// The point-in-time is retained so the next poll can cheaply confirm
    /// that no new documents arrived; the search-after position is cleared
    /// because there is no last document to anchor it.
    pub fn exhausted(&self) -> Self {
        Self {
            sort_values: None,
            ..self.clone()
        }
    }

    /// Strip session state for long-term storage. The point in time will not
    /// outlive its lease and a search-after key is meaningless without it,
    /// but the field bounds and counters still describe the resume position
    /// exactly. A graceful detach, so unlike [`Cursor::reframe`] it does not
    /// count against `scroll_limit`.
    pub fn detached(&self) -> Self {
        Self {
            pit_id: None,
            sort_values: None,
            ..self.clone()
        }
    }

    /// Check the structural invariants that queries depend on: a named
    /// index and at least one cursor field, none with an empty name.
    ///
    /// # Errors
    /// Returns a configuration error before any remote call is made.
    pub fn validate(&self) -> Result<(), ElasticError> {
        if self.index.is_empty() {
            return Err(ElasticError::Config("cursor has no index name".into()));
        }
        if self.cursor_fields.is_empty() {
            return Err(ElasticError::Config(format!(
                "cursor for index '{}' has no cursor fields",
                self.index
            )));
        }
        if let Some(field) = self.cursor_fields.iter().find(|f| f.field.is_empty()) {
            return Err(ElasticError::Config(format!(
                "cursor for index '{}' has an unnamed cursor field (initial value: {})",
                self.index, field.initial_value
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bounds = self
            .cursor_fields
            .iter()
            .map(|cf| format!("{}={}", cf.field, cf.initial_value))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{} [{}] ({} docs, {} reframes)",
            self.index, bounds, self.running_document_count, self.scroll_limit
        )
    }
}
