//! Paginated extraction engine
//!
//! [`ElasticRepository`] turns a [`Cursor`] into pages: it keeps a point in
//! time open over the target index, fetches one sorted page per call with the
//! configured retry policy, advances the cursor from the last hit's sort key,
//! and recovers expired sessions by reframing the cursor and trying once
//! more.
//!
//! The engine never mutates a cursor in place. Every call returns the next
//! cursor inside the [`Page`], so a caller that fails to persist it can
//! always retry from the previous one.

use super::cursor::{Cursor, CursorValue};
use super::error::ElasticError;
use super::page::{self, Page};
use super::query;
use super::retry::RetryPolicy;
use super::store::DocumentStore;
use log::{debug, warn};
use serde_json::Value;

/// Documents fetched per search.
pub const DEFAULT_PAGE_SIZE: u64 = 5000;
/// Lease on the point in time, renewed by every search.
pub const DEFAULT_PIT_KEEP_ALIVE_SECONDS: u64 = 300;
/// Shortest usable lease; below this a slow page outlives its own session.
pub const MIN_PIT_KEEP_ALIVE_SECONDS: u64 = 35;
/// Attempts per remote search.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Pause between failed attempts.
pub const DEFAULT_RETRY_BACKOFF_MILLIS: u64 = 1000;

/// Searches renew the lease slightly below the open keep-alive so a renewal
/// never extends a session past the point the next open would start from.
const KEEP_ALIVE_RENEWAL_MARGIN_SECONDS: u64 = 5;

/// Cursor-driven page fetcher over a [`DocumentStore`].
#[derive(Debug)]
pub struct ElasticRepository<S> {
    store: S,
    page_size: u64,
    pit_keep_alive_seconds: u64,
    retry: RetryPolicy,
}

impl<S: DocumentStore> ElasticRepository<S> {
    /// Build an engine over `store`. Out-of-range settings are clamped:
    /// `page_size` to at least 1, `pit_keep_alive_seconds` to at least
    /// [`MIN_PIT_KEEP_ALIVE_SECONDS`].
    pub fn new(store: S, page_size: u64, pit_keep_alive_seconds: u64, retry: RetryPolicy) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            pit_keep_alive_seconds: pit_keep_alive_seconds.max(MIN_PIT_KEEP_ALIVE_SECONDS),
            retry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the page after `cursor`.
    ///
    /// Opens a point in time when the cursor has none, then runs one search
    /// under the retry policy. A [`ElasticError::SessionExpired`] failure on
    /// a scrollable cursor closes the stale session and retries against a
    /// reframed cursor; the reframed cursor is not scrollable, so a repeat
    /// of the failure propagates instead of looping.
    ///
    /// An empty page means the stream is exhausted at the cursor's bounds;
    /// the returned cursor keeps the session so the next poll stays cheap.
    pub async fn search(&self, cursor: &Cursor) -> Result<Page, ElasticError> {
        cursor.validate()?;
        let mut cursor = cursor.clone();

        loop {
            let session = match cursor.pit_id {
                Some(_) => cursor.clone(),
                None => {
                    let pit_id = self
                        .store
                        .open_point_in_time(&cursor.index, self.pit_keep_alive_seconds)
                        .await?;
                    debug!("Opened point in time over '{}'", cursor.index);
                    cursor.with_pit_id(pit_id)
                }
            };

            let body = query::search_body(&session, self.page_size, self.renewal_keep_alive());
            match self.retry.run(|| self.store.search(&body)).await {
                Ok(response) => return self.harvest(session, response),
                // Scrollability is judged on the cursor as handed in, not on
                // the session just attached. A reframed cursor is fresh, so
                // this recovery runs at most once per search call.
                Err(error) if error.is_session_expired() && cursor.is_scrollable() => {
                    warn!(
                        "Point in time for '{}' expired ({}), reframing cursor",
                        cursor.index, error
                    );
                    self.close_quietly(session.pit_id.as_deref()).await;
                    cursor = cursor.reframe();
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Release the cursor's session and return the cursor stripped of
    /// session state, ready to persist as a durable offset. Closing is
    /// best-effort; an already-expired session is not an error.
    pub async fn close_session(&self, cursor: &Cursor) -> Cursor {
        self.close_quietly(cursor.pit_id.as_deref()).await;
        cursor.detached()
    }

    fn renewal_keep_alive(&self) -> u64 {
        self.pit_keep_alive_seconds - KEEP_ALIVE_RENEWAL_MARGIN_SECONDS
    }

    fn harvest(
        &self,
        cursor: Cursor,
        response: super::store::SearchResponse,
    ) -> Result<Page, ElasticError> {
        // The store may rotate the point in time; the response id supersedes
        // the one the search was sent with.
        let cursor = match response.pit_id {
            Some(pit_id) => cursor.with_pit_id(pit_id),
            None => cursor,
        };

        let hits = response.hits.hits;
        let page_len = hits.len() as u64;
        let sort_values = match hits.last() {
            None => {
                debug!(
                    "'{}' exhausted after {} documents",
                    cursor.index, cursor.running_document_count
                );
                return Ok(Page::new(vec![], cursor.exhausted()));
            }
            Some(last) => last_sort_values(&cursor, &last.sort)?,
        };

        let advanced = cursor.advanced(sort_values, page_len);
        debug!(
            "Fetched {} documents from '{}' ({} so far)",
            page_len, advanced.index, advanced.running_document_count
        );

        let documents = hits.into_iter().map(page::document_from_hit).collect();
        Ok(Page::new(documents, advanced))
    }

    async fn close_quietly(&self, pit_id: Option<&str>) {
        if let Some(pit_id) = pit_id {
            match self.store.close_point_in_time(pit_id).await {
                Ok(()) => debug!("Closed point in time"),
                Err(error) => debug!("Could not close point in time: {}", error),
            }
        }
    }
}

/// Lift the last hit's sort key into cursor values. The key anchors both the
/// advanced field bounds and the next search-after, so a key missing or too
/// short to rewrite every field bound, or a value that is neither integer nor
/// string, stops the stream rather than corrupting its position.
fn last_sort_values(cursor: &Cursor, sort: &[Value]) -> Result<Vec<CursorValue>, ElasticError> {
    // Longer keys are expected under a point in time (the store appends its
    // shard tie-break); a shorter key would drop trailing cursor fields.
    if sort.len() < cursor.cursor_fields.len() {
        return Err(ElasticError::UnexpectedResponse(format!(
            "hit from '{}' carries {} sort value(s) for {} cursor field(s); cannot advance the cursor",
            cursor.index,
            sort.len(),
            cursor.cursor_fields.len()
        )));
    }
    sort.iter()
        .map(|value| {
            CursorValue::from_json(value).ok_or_else(|| {
                ElasticError::UnexpectedResponse(format!(
                    "unsupported sort value {} from '{}'; cursors advance over integers and strings",
                    value, cursor.index
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elastic::cursor::CursorField;
    use crate::elastic::store::testing::{MockStore, hit, response};
    use serde_json::json;
    use std::io;
    use std::time::Duration;

    fn expired() -> ElasticError {
        ElasticError::SessionExpired {
            reason: "search_context_missing_exception".into(),
        }
    }

    fn transport() -> ElasticError {
        ElasticError::transport(io::Error::other("connection reset"))
    }

    fn repository(store: MockStore) -> ElasticRepository<MockStore> {
        let retry = RetryPolicy::try_new(3, Duration::ZERO).unwrap();
        ElasticRepository::new(store, 500, 300, retry)
    }

    fn orders_cursor() -> Cursor {
        Cursor::of("orders", vec![CursorField::new("id", 0)])
    }

    #[tokio::test]
    async fn test_fresh_cursor_opens_session_and_advances() {
        let store = MockStore::with_pits(&["pit-1"]).script(vec![Ok(response(
            Some("pit-1b"),
            vec![hit("a", vec![json!(1), json!(0)]), hit("b", vec![json!(2), json!(0)])],
        ))]);
        let repo = repository(store);

        let page = repo.search(&orders_cursor()).await.unwrap();

        assert_eq!(repo.store().opened(), vec!["orders"]);
        assert_eq!(page.len(), 2);
        assert_eq!(page.documents[0]["es-id"], json!("a"));
        assert_eq!(page.documents[0]["es-index"], json!("orders"));

        let cursor = &page.cursor;
        assert_eq!(cursor.pit_id.as_deref(), Some("pit-1b"));
        assert_eq!(cursor.cursor_fields[0].initial_value, CursorValue::Int(2));
        assert_eq!(
            cursor.sort_values,
            Some(vec![CursorValue::Int(2), CursorValue::Int(0)])
        );
        assert_eq!(cursor.running_document_count, 2);
        assert_eq!(cursor.scroll_limit, 0);

        let body = &repo.store().bodies()[0];
        assert_eq!(body["pit"]["id"], json!("pit-1"));
        assert_eq!(body["pit"]["keep_alive"], json!("295s"));
        assert_eq!(body["size"], json!(500));
        assert_eq!(body.get("search_after"), None);
        assert_eq!(
            body["query"]["bool"]["must"][0],
            json!({"range": {"id": {"gte": 0}}})
        );
    }

    #[tokio::test]
    async fn test_next_page_resumes_with_search_after() {
        let first = response(Some("pit-1"), vec![hit("a", vec![json!(5), json!(9)])]);
        let second = response(Some("pit-1"), vec![hit("b", vec![json!(6), json!(2)])]);
        let repo = repository(MockStore::with_pits(&["pit-1"]).script(vec![Ok(first), Ok(second)]));

        let page = repo.search(&orders_cursor()).await.unwrap();
        let next = repo.search(&page.cursor).await.unwrap();

        // The session carries over; only one point in time is ever opened.
        assert_eq!(repo.store().opened().len(), 1);
        let body = &repo.store().bodies()[1];
        assert_eq!(body["search_after"], json!([5, 9]));
        assert_eq!(
            body["query"]["bool"]["must"][0],
            json!({"range": {"id": {"gte": 5}}})
        );
        assert_eq!(next.cursor.running_document_count, 2);
    }

    #[tokio::test]
    async fn test_empty_page_exhausts_and_stays_exhausted() {
        let repo = repository(MockStore::with_pits(&["pit-1"]).script(vec![
            Ok(response(Some("pit-1"), vec![hit("a", vec![json!(3), json!(1)])])),
            Ok(response(Some("pit-2"), vec![])),
            Ok(response(Some("pit-2"), vec![])),
        ]));

        let first = repo.search(&orders_cursor()).await.unwrap();
        let drained = repo.search(&first.cursor).await.unwrap();

        assert!(drained.is_empty());
        let cursor = &drained.cursor;
        assert_eq!(cursor.pit_id.as_deref(), Some("pit-2"));
        assert_eq!(cursor.sort_values, None);
        assert_eq!(cursor.running_document_count, 1);

        // Polling an exhausted cursor is stable: still empty at the same
        // position, with no new session opened.
        let again = repo.search(&drained.cursor).await.unwrap();
        assert!(again.is_empty());
        assert_eq!(again.cursor, drained.cursor);
        assert_eq!(repo.store().opened().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_reframes_once() {
        let recovered = response(Some("pit-2"), vec![hit("a", vec![json!(42), json!(7)])]);
        let repo = repository(
            MockStore::with_pits(&["pit-2"]).script(vec![Err(expired()), Ok(recovered)]),
        );

        let resumed = orders_cursor()
            .with_pit_id("pit-stale")
            .advanced(vec![CursorValue::Int(41), CursorValue::Int(3)], 41);
        let page = repo.search(&resumed).await.unwrap();

        // Stale session closed, a fresh one opened for the retry.
        assert_eq!(repo.store().closed(), vec!["pit-stale"]);
        assert_eq!(repo.store().opened(), vec!["orders"]);

        // The reframed search drops search-after and excludes the last
        // consumed document by value.
        let retry_body = &repo.store().bodies()[1];
        assert_eq!(retry_body.get("search_after"), None);
        assert_eq!(
            retry_body["query"]["bool"]["must"][0],
            json!({"range": {"id": {"gt": 41}}})
        );

        let cursor = &page.cursor;
        assert_eq!(cursor.scroll_limit, 1);
        assert_eq!(cursor.pit_id.as_deref(), Some("pit-2"));
        assert_eq!(cursor.running_document_count, 42);
    }

    #[tokio::test]
    async fn test_second_expiry_propagates() {
        let repo = repository(
            MockStore::with_pits(&["pit-2"]).script(vec![Err(expired()), Err(expired())]),
        );

        let resumed = orders_cursor().with_pit_id("pit-stale").advanced(
            vec![CursorValue::Int(10), CursorValue::Int(1)],
            10,
        );
        let error = repo.search(&resumed).await.unwrap_err();

        assert!(error.is_session_expired());
        // Only the stale session from the first failure is closed.
        assert_eq!(repo.store().closed(), vec!["pit-stale"]);
        assert_eq!(repo.store().bodies().len(), 2);
    }

    #[tokio::test]
    async fn test_fresh_cursor_expiry_is_fatal() {
        let repo = repository(MockStore::with_pits(&["pit-1"]).script(vec![Err(expired())]));

        let error = repo.search(&orders_cursor()).await.unwrap_err();
        assert!(error.is_session_expired());
        assert_eq!(repo.store().closed().len(), 0);
    }

    #[tokio::test]
    async fn test_transport_failures_retried_within_one_search() {
        let repo = repository(MockStore::with_pits(&["pit-1"]).script(vec![
            Err(transport()),
            Err(transport()),
            Ok(response(Some("pit-1"), vec![hit("a", vec![json!(1), json!(0)])])),
        ]));

        let page = repo.search(&orders_cursor()).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(repo.store().bodies().len(), 3);
        assert_eq!(repo.store().opened().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_transport_error() {
        let repo = repository(MockStore::with_pits(&["pit-1"]).script(vec![
            Err(transport()),
            Err(transport()),
            Err(transport()),
        ]));

        let error = repo.search(&orders_cursor()).await.unwrap_err();
        assert!(error.is_transport());
        assert_eq!(repo.store().bodies().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_cursor_rejected_before_any_call() {
        let repo = repository(MockStore::default());

        let error = repo.search(&Cursor::of("orders", vec![])).await.unwrap_err();
        assert!(matches!(error, ElasticError::Config(_)));
        assert_eq!(repo.store().opened().len(), 0);
        assert_eq!(repo.store().bodies().len(), 0);
    }

    #[tokio::test]
    async fn test_unusable_sort_key_stops_the_stream() {
        let missing = repository(
            MockStore::with_pits(&["pit-1"])
                .script(vec![Ok(response(Some("pit-1"), vec![hit("a", vec![])]))]),
        );
        let error = missing.search(&orders_cursor()).await.unwrap_err();
        assert!(matches!(error, ElasticError::UnexpectedResponse(_)));

        let fractional = repository(MockStore::with_pits(&["pit-1"]).script(vec![Ok(response(
            Some("pit-1"),
            vec![hit("a", vec![json!(1.5)])],
        ))]));
        let error = fractional.search(&orders_cursor()).await.unwrap_err();
        assert!(matches!(error, ElasticError::UnexpectedResponse(_)));
    }

    #[tokio::test]
    async fn test_short_sort_key_stops_the_stream() {
        let repo = repository(MockStore::with_pits(&["pit-1"]).script(vec![Ok(response(
            Some("pit-1"),
            vec![hit("a", vec![json!(4711)])],
        ))]));
        let cursor = Cursor::of(
            "orders",
            vec![CursorField::new("timestamp", 0), CursorField::new("seq", 0)],
        );

        // A key that cannot rewrite every field bound must not advance (and
        // silently narrow) the cursor.
        let error = repo.search(&cursor).await.unwrap_err();
        match error {
            ElasticError::UnexpectedResponse(reason) => {
                assert!(reason.contains("1 sort value(s) for 2 cursor field(s)"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_close_session_detaches_cursor() {
        let repo = repository(MockStore::default());
        let cursor = orders_cursor()
            .with_pit_id("pit-9")
            .advanced(vec![CursorValue::Int(8), CursorValue::Int(0)], 8);

        let stored = repo.close_session(&cursor).await;

        assert_eq!(repo.store().closed(), vec!["pit-9"]);
        assert_eq!(stored.pit_id, None);
        assert_eq!(stored.sort_values, None);
        assert_eq!(stored.running_document_count, 8);
        assert_eq!(stored.scroll_limit, 0);
    }

    #[tokio::test]
    async fn test_settings_clamped_to_usable_ranges() {
        let retry = RetryPolicy::try_new(1, Duration::ZERO).unwrap();
        let repo = ElasticRepository::new(
            MockStore::with_pits(&["pit-1"]).script(vec![Ok(response(Some("pit-1"), vec![]))]),
            0,
            10,
            retry,
        );

        repo.search(&orders_cursor()).await.unwrap();
        let body = &repo.store().bodies()[0];
        assert_eq!(body["size"], json!(1));
        // 35s floor minus the 5s renewal margin.
        assert_eq!(body["pit"]["keep_alive"], json!("30s"));
    }
}
