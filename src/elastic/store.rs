//! Document store abstraction
//!
//! [`DocumentStore`] is the seam between pagination logic and the wire: the
//! repository drives sessions and pages through this trait, the HTTP client
//! implements it, and tests swap in scripted fakes.

use super::error::ElasticError;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;

/// Minimal store surface the pagination engine needs.
pub trait DocumentStore {
    /// Open a point in time over `index` and return its handle.
    fn open_point_in_time(
        &self,
        index: &str,
        keep_alive_seconds: u64,
    ) -> impl Future<Output = Result<String, ElasticError>> + Send;

    /// Execute one search with the given request body.
    fn search(&self, body: &Value) -> impl Future<Output = Result<SearchResponse, ElasticError>> + Send;

    /// Release a point in time. Handles the store no longer knows are not an
    /// error; the session was already gone.
    fn close_point_in_time(&self, pit_id: &str) -> impl Future<Output = Result<(), ElasticError>> + Send;
}

/// Top-level search response, reduced to the fields pagination consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Refreshed point-in-time handle; supersedes the one sent.
    #[serde(default)]
    pub pit_id: Option<String>,
    pub hits: Hits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hits {
    pub hits: Vec<Hit>,
}

/// One search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
    /// The document's literal sort key, echoed for search-after.
    #[serde(default)]
    pub sort: Vec<Value>,
}

impl SearchResponse {
    /// The sort key of the last hit, if the page is non-empty.
    pub fn last_sort(&self) -> Option<&[Value]> {
        self.hits.hits.last().map(|hit| hit.sort.as_slice())
    }
}
