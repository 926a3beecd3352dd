//! Streaming algorithms for the import pipeline.
//!
//! - Heap-based k-way merge of pre-sorted sources
//! - Grouping of the merged stream into per-test-code runs

pub mod group;
pub mod merge;

pub use group::{GroupByTestCode, TestGroup};
pub use merge::KWayMerge;
