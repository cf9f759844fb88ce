//! Pipeline orchestration for ETL operations

use super::{Extractor, Loader, Transformer};
use eyre::Result;

/// ETL Pipeline that orchestrates Extract, Transform, and Load page by page
///
/// Pages flow through the pipeline one at a time: each page is fully loaded
/// before the next page is requested, so the source position only ever runs
/// one page ahead of the destination.
///
/// # Type Parameters
/// - `E`: Extractor type
/// - `T`: Transformer type (must transform from E::Item)
/// - `L`: Loader type (must load T::Output)
///
/// # Example
/// ```no_run
/// use elastic_index_tailer::etl::{Extractor, Loader, Pipeline, Transformer};
/// use eyre::Result;
///
/// struct OnePage(Option<Vec<i32>>);
///
/// impl Extractor for OnePage {
///     type Item = i32;
///     async fn next_page(&mut self) -> Result<Option<Vec<i32>>> {
///         Ok(self.0.take())
///     }
/// }
///
/// struct Double;
///
/// impl Transformer for Double {
///     type Input = i32;
///     type Output = i32;
///     fn transform(&self, input: i32) -> Result<i32> {
///         Ok(input * 2)
///     }
/// }
///
/// struct Discard;
///
/// impl Loader for Discard {
///     type Item = i32;
///     async fn load(&self, items: Vec<i32>) -> Result<usize> {
///         Ok(items.len())
///     }
/// }
///
/// # async fn example() -> Result<()> {
/// let mut pipeline = Pipeline::new(OnePage(Some(vec![1, 2, 3])), Double, Discard);
///
/// let count = pipeline.run().await?;
/// println!("Processed {} items", count);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, T, L> {
    extractor: E,
    transformer: T,
    loader: L,
}

impl<E, T, L> Pipeline<E, T, L>
where
    E: Extractor,
    T: Transformer<Input = E::Item>,
    L: Loader<Item = T::Output>,
{
    /// Create a new pipeline
    pub fn new(extractor: E, transformer: T, loader: L) -> Self {
        Self {
            extractor,
            transformer,
            loader,
        }
    }

    /// The extractor, for inspecting its position between runs
    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Mutable access to the extractor, for re-arming or closing it
    pub fn extractor_mut(&mut self) -> &mut E {
        &mut self.extractor
    }

    /// Run the pipeline until the extractor reports exhaustion
    ///
    /// Returns the total number of items loaded across all pages
    ///
    /// # Errors
    /// Returns an error if any stage fails; pages already loaded stay loaded
    pub async fn run(&mut self) -> Result<usize> {
        self.run_with(|_| Ok(())).await
    }

    /// Run the pipeline, calling `after_page` once per fully loaded page
    ///
    /// The callback sees the extractor after its position advanced past the
    /// loaded page, making it the place to persist a resume point: a crash
    /// before the callback re-delivers that page on restart, never skips it.
    ///
    /// # Errors
    /// Returns an error if any stage or the callback fails
    pub async fn run_with<F>(&mut self, mut after_page: F) -> Result<usize>
    where
        F: FnMut(&E) -> Result<()>,
    {
        log::info!("Starting ETL pipeline");
        let mut total = 0;
        let mut pages = 0u64;

        while let Some(items) = self.extractor.next_page().await? {
            pages += 1;
            log::debug!("Extracted page {} with {} items", pages, items.len());

            let transformed = self.transformer.transform_many(items)?;
            let count = self.loader.load(transformed).await?;
            total += count;

            after_page(&self.extractor)?;
            log::debug!("Loaded page {} ({} items total)", pages, total);
        }

        log::info!("Pipeline complete: {} items in {} pages", total, pages);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct PagedSource {
        pages: VecDeque<Vec<i32>>,
        served: usize,
    }

    impl PagedSource {
        fn new(pages: Vec<Vec<i32>>) -> Self {
            Self {
                pages: pages.into(),
                served: 0,
            }
        }
    }

    impl Extractor for PagedSource {
        type Item = i32;

        async fn next_page(&mut self) -> Result<Option<Vec<i32>>> {
            let page = self.pages.pop_front();
            if page.is_some() {
                self.served += 1;
            }
            Ok(page)
        }
    }

    struct DoubleTransformer;

    impl Transformer for DoubleTransformer {
        type Input = i32;
        type Output = i32;

        fn transform(&self, input: Self::Input) -> Result<Self::Output> {
            Ok(input * 2)
        }
    }

    struct SinkLoader(Arc<Mutex<Vec<i32>>>);

    impl Loader for SinkLoader {
        type Item = i32;

        async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
            let count = items.len();
            self.0.lock().unwrap().extend(items);
            Ok(count)
        }
    }

    struct FailingLoader;

    impl Loader for FailingLoader {
        type Item = i32;

        async fn load(&self, _items: Vec<Self::Item>) -> Result<usize> {
            eyre::bail!("destination unavailable")
        }
    }

    #[tokio::test]
    async fn test_pipeline_drains_all_pages() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new(
            PagedSource::new(vec![vec![1, 2], vec![3], vec![4, 5]]),
            DoubleTransformer,
            SinkLoader(sink.clone()),
        );

        let count = pipeline.run().await.unwrap();
        assert_eq!(count, 5);
        assert_eq!(*sink.lock().unwrap(), vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test]
    async fn test_empty_source_loads_nothing() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new(
            PagedSource::new(vec![]),
            DoubleTransformer,
            SinkLoader(sink.clone()),
        );

        let count = pipeline.run().await.unwrap();
        assert_eq!(count, 0);
        assert!(sink.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_follows_every_loaded_page() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new(
            PagedSource::new(vec![vec![1], vec![2], vec![3]]),
            DoubleTransformer,
            SinkLoader(sink.clone()),
        );

        let mut checkpoints = Vec::new();
        pipeline
            .run_with(|extractor| {
                checkpoints.push(extractor.served);
                Ok(())
            })
            .await
            .unwrap();

        // One checkpoint per page, each seeing the advanced position.
        assert_eq!(checkpoints, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_load_failure_stops_before_checkpoint() {
        let mut pipeline = Pipeline::new(
            PagedSource::new(vec![vec![1], vec![2]]),
            DoubleTransformer,
            FailingLoader,
        );

        let mut checkpoints = 0;
        let result = pipeline
            .run_with(|_| {
                checkpoints += 1;
                Ok(())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(checkpoints, 0);
    }
}
