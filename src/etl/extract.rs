//! Extractor trait for paged data extraction

use eyre::Result;

/// Extractor trait for pulling items out of a source one page at a time
///
/// Implementors define how to fetch pages from sources like:
/// - Elasticsearch indices
/// - File systems
/// - Databases
///
/// Returning `None` signals that the source is exhausted; the pipeline stops
/// asking. An extractor advances its own position between pages, which is why
/// `next_page` takes `&mut self`.
///
/// # Example
/// ```no_run
/// use elastic_index_tailer::etl::Extractor;
/// use eyre::Result;
///
/// struct Countdown(u32);
///
/// impl Extractor for Countdown {
///     type Item = u32;
///
///     async fn next_page(&mut self) -> Result<Option<Vec<Self::Item>>> {
///         match self.0 {
///             0 => Ok(None),
///             n => {
///                 self.0 -= 1;
///                 Ok(Some(vec![n]))
///             }
///         }
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// The type of items extracted
    type Item: Send;

    /// Fetch the next page of items, or `None` when the source is exhausted
    ///
    /// # Errors
    /// Returns an error if extraction fails (network, I/O, parsing, etc.)
    fn next_page(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<Vec<Self::Item>>>> + Send;
}
