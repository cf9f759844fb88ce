//! Loader trait for writing extracted data to a destination

use eyre::Result;

/// Loader trait for delivering items to a destination
///
/// Implementors define where extracted pages end up:
/// - Local files
/// - Message queues
/// - Downstream databases
///
/// A paged pipeline calls `load` once per extracted page, so loaders are
/// expected to append rather than replace.
///
/// # Example
/// ```no_run
/// use elastic_index_tailer::etl::Loader;
/// use eyre::Result;
///
/// struct Discard;
///
/// impl Loader for Discard {
///     type Item = String;
///
///     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
///         Ok(items.len())
///     }
/// }
/// ```
pub trait Loader: Send + Sync {
    /// Item type accepted from the transformer
    type Item: Send;

    /// Write one page of items to the destination
    ///
    /// Returns how many items were written
    ///
    /// # Errors
    /// Returns an error if the destination rejects the page (network, I/O,
    /// full disk, etc.)
    fn load(
        &self,
        items: Vec<Self::Item>,
    ) -> impl std::future::Future<Output = Result<usize>> + Send;
}
