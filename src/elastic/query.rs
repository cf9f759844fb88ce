//! Search request construction
//!
//! Pure translation from a [`Cursor`] to the JSON body of a paged search:
//! one ascending sort and one range filter per cursor field, plus the
//! session state (point in time, search-after) the cursor carries.

use super::cursor::Cursor;
use serde_json::{Value, json};

/// Build the body for the next page of `cursor`.
///
/// `keep_alive_seconds` is embedded with the point-in-time id so every
/// search extends the session's lease.
pub fn search_body(cursor: &Cursor, page_size: u64, keep_alive_seconds: u64) -> Value {
    let compare = match cursor.include_lower_bound() {
        true => "gte",
        false => "gt",
    };

    let must = cursor
        .cursor_fields
        .iter()
        .map(|cf| {
            let field = cf.field.as_str();
            json!({"range": {field: {compare: cf.initial_value.as_json()}}})
        })
        .collect::<Vec<_>>();

    let sort = cursor
        .cursor_fields
        .iter()
        .map(|cf| {
            let field = cf.field.as_str();
            json!({field: "asc"})
        })
        .collect::<Vec<_>>();

    let mut body = json!({
        "query": {"bool": {"must": must}},
        "sort": sort,
        "size": page_size,
    });

    if let Some(pit_id) = &cursor.pit_id {
        body["pit"] = json!({
            "id": pit_id,
            "keep_alive": format!("{keep_alive_seconds}s"),
        });
    }
    if let Some(sort_values) = &cursor.sort_values {
        body["search_after"] = sort_values.iter().map(|v| v.as_json()).collect();
    }

    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elastic::cursor::{CursorField, CursorValue};

    fn two_field_cursor() -> Cursor {
        Cursor::of(
            "orders",
            vec![
                CursorField::new("updated_at", 0),
                CursorField::new("id", ""),
            ],
        )
    }

    #[test]
    fn test_fresh_cursor_body() {
        let body = search_body(&two_field_cursor(), 500, 295);
        assert_eq!(
            body,
            json!({
                "query": {"bool": {"must": [
                    {"range": {"updated_at": {"gte": 0}}},
                    {"range": {"id": {"gte": ""}}}
                ]}},
                "sort": [{"updated_at": "asc"}, {"id": "asc"}],
                "size": 500,
            })
        );
    }

    #[test]
    fn test_in_session_body_carries_pit_and_search_after() {
        let cursor = two_field_cursor().with_pit_id("pit-1").advanced(
            vec![
                CursorValue::Int(1000),
                CursorValue::Str("order-7".into()),
                CursorValue::Int(3),
            ],
            500,
        );

        let body = search_body(&cursor, 500, 295);
        assert_eq!(body["pit"], json!({"id": "pit-1", "keep_alive": "295s"}));
        assert_eq!(body["search_after"], json!([1000, "order-7", 3]));
        // In-session the range stays an inclusive guard on the advanced bounds.
        assert_eq!(
            body["query"]["bool"]["must"][0],
            json!({"range": {"updated_at": {"gte": 1000}}})
        );
    }

    #[test]
    fn test_resume_without_session_excludes_last_bound() {
        let resumed = two_field_cursor()
            .advanced(vec![CursorValue::Int(1000), CursorValue::Str("x".into())], 42)
            .reframe();

        let body = search_body(&resumed, 500, 295);
        assert_eq!(body.get("pit"), None);
        assert_eq!(body.get("search_after"), None);
        assert_eq!(
            body["query"]["bool"]["must"][0],
            json!({"range": {"updated_at": {"gt": 1000}}})
        );
    }

    #[test]
    fn test_extreme_bounds_survive_body_construction() {
        let cursor = Cursor::of("orders", vec![CursorField::new("seq", i64::MAX)]);
        let body = search_body(&cursor, 1, 30);
        assert_eq!(
            body["query"]["bool"]["must"][0]["range"]["seq"]["gte"],
            json!(9223372036854775807_i64)
        );
    }
}
