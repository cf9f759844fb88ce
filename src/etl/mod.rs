//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides trait definitions for building paged data pipelines
//! that extract data from sources page by page, transform it, and load it to
//! destinations, with a checkpoint hook after every loaded page.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::Pipeline;
pub use transform::Transformer;
