//! Transformer trait for shaping documents between extraction and load

use eyre::Result;

/// Transformer trait for reshaping items between the extractor and the loader
///
/// Implementors decide what a document looks like by the time it reaches the
/// destination:
/// - Projection (keeping a subset of fields)
/// - Enrichment (adding computed fields)
/// - Format conversion
///
/// # Example
/// ```no_run
/// use elastic_index_tailer::etl::Transformer;
/// use eyre::Result;
///
/// struct AmountOnly;
///
/// impl Transformer for AmountOnly {
///     type Input = serde_json::Value;
///     type Output = serde_json::Value;
///
///     fn transform(&self, input: Self::Input) -> Result<Self::Output> {
///         Ok(input.get("amount").cloned().unwrap_or(serde_json::Value::Null))
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Item type coming out of the extractor
    type Input: Send;

    /// Item type handed to the loader
    type Output: Send;

    /// Transform a single item
    ///
    /// # Errors
    /// Returns an error if the item cannot be transformed
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;

    /// Transform a whole page of items, stopping at the first failure
    fn transform_many(&self, inputs: Vec<Self::Input>) -> Result<Vec<Self::Output>> {
        inputs.into_iter().map(|i| self.transform(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NonNegative;

    impl Transformer for NonNegative {
        type Input = i64;
        type Output = i64;

        fn transform(&self, input: Self::Input) -> Result<Self::Output> {
            match input < 0 {
                true => eyre::bail!("negative value: {input}"),
                false => Ok(input),
            }
        }
    }

    #[test]
    fn test_transform_many_maps_every_item() {
        let out = NonNegative.transform_many(vec![1, 2, 3]).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_transform_many_stops_at_first_failure() {
        assert!(NonNegative.transform_many(vec![1, -2, 3]).is_err());
    }
}
