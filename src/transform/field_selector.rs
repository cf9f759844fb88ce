//! Field selector transformer
//!
//! Projects exported documents down to a chosen set of fields, for indices
//! whose documents are wider than the consumer wants to store.

use crate::elastic::{ID_FIELD, INDEX_FIELD};
use crate::etl::Transformer;
use eyre::Result;
use serde_json::Value;

/// Transformer that keeps only the selected fields of each document
///
/// The synthetic identity fields (`es-id`, `es-index`) are always kept, so
/// every exported line stays traceable to its source document regardless of
/// the projection.
///
/// # Example
/// ```
/// use elastic_index_tailer::transform::FieldSelector;
/// use elastic_index_tailer::etl::Transformer;
/// use serde_json::json;
///
/// let selector = FieldSelector::keep(vec!["amount".to_string()]);
/// let input = json!({
///     "es-id": "4711",
///     "es-index": "orders",
///     "amount": 25,
///     "internal_note": "drop me"
/// });
///
/// let output = selector.transform(input).unwrap();
/// assert_eq!(output["amount"], 25);
/// assert_eq!(output["es-id"], "4711");
/// assert!(!output.as_object().unwrap().contains_key("internal_note"));
/// ```
pub struct FieldSelector {
    fields: Option<Vec<String>>,
}

impl FieldSelector {
    /// Create a selector that keeps only the listed fields
    pub fn keep(fields: Vec<String>) -> Self {
        Self {
            fields: Some(fields),
        }
    }

    /// Create a selector that passes documents through unchanged
    pub fn passthrough() -> Self {
        Self { fields: None }
    }
}

impl Transformer for FieldSelector {
    type Input = Value;
    type Output = Value;

    fn transform(&self, mut input: Self::Input) -> Result<Self::Output> {
        let Some(fields) = &self.fields else {
            return Ok(input);
        };
        if let Some(obj) = input.as_object_mut() {
            obj.retain(|key, _| {
                key == ID_FIELD || key == INDEX_FIELD || fields.iter().any(|f| f == key)
            });
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keep_projects_to_selected_fields() {
        let selector = FieldSelector::keep(vec!["order_id".to_string(), "amount".to_string()]);
        let input = json!({
            "es-id": "1",
            "es-index": "orders",
            "order_id": 4711,
            "amount": 25,
            "customer": "ACME",
            "internal_note": "wholesale"
        });

        let output = selector.transform(input).unwrap();
        let obj = output.as_object().unwrap();

        assert_eq!(obj.len(), 4);
        assert_eq!(output["order_id"], 4711);
        assert_eq!(output["amount"], 25);
        assert_eq!(output["es-id"], "1");
        assert_eq!(output["es-index"], "orders");
    }

    #[test]
    fn test_passthrough_keeps_everything() {
        let selector = FieldSelector::passthrough();
        let input = json!({"a": 1, "b": 2});

        let output = selector.transform(input.clone()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_selected_field_absent_from_document() {
        let selector = FieldSelector::keep(vec!["missing".to_string()]);
        let input = json!({"es-id": "1", "es-index": "orders", "present": true});

        let output = selector.transform(input).unwrap();
        let obj = output.as_object().unwrap();

        assert!(!obj.contains_key("present"));
        assert!(!obj.contains_key("missing"));
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn test_non_object_passes_through() {
        let selector = FieldSelector::keep(vec!["a".to_string()]);
        assert_eq!(selector.transform(json!(42)).unwrap(), json!(42));
    }

    #[test]
    fn test_transform_many() {
        let selector = FieldSelector::keep(vec!["id".to_string()]);
        let inputs = vec![
            json!({"id": "1", "noise": true}),
            json!({"id": "2", "noise": true}),
        ];

        let outputs = selector.transform_many(inputs).unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(!outputs[0].as_object().unwrap().contains_key("noise"));
        assert_eq!(outputs[1]["id"], "2");
    }
}
