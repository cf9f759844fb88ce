//! Transform implementations for exported documents
//!
//! This module provides concrete transformer implementations applied between
//! extraction and the NDJSON sink.

mod field_selector;

pub use field_selector::FieldSelector;
