//! # Chunked Bagging
//!
//! Data partitioning for bagging ensembles over chunked datasets.
//!
//! A dataset that is physically split into chunks is sampled for every
//! member of an ensemble: each estimator gets its own bootstrap row sample
//! and, optionally, its own feature subset. The same feature subsets can
//! later be replayed onto another dataset with an unrelated chunk layout for
//! scoring.
//!
//! ## Features
//!
//! - **Partition-independent sampling**: every estimator draws from its own
//!   random substream derived from the base seed and its id, so plans are
//!   identical whatever the chunking or thread count.
//! - **Minimal materialization**: a gather task fetches only the row and
//!   column blocks its estimators touch, each exactly once.
//! - **Lazy handles**: planning returns [`Tileable`] outputs whose chunks are
//!   computed on an executor ([`InlineExecutor`] or the rayon-backed
//!   [`RayonExecutor`]).
//! - **Matrices and labeled tables**: gather and reindex are written once
//!   against the [`Tabular`] capability.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chunked_bagging::prelude::*;
//! use ndarray::Array2;
//! use std::sync::Arc;
//!
//! # fn main() -> chunked_bagging::Result<()> {
//! chunked_bagging::init()?;
//!
//! let storage = Arc::new(InMemoryStorage::new());
//! let train = storage.store_matrix("train", &Array2::zeros((100, 50)), (20, 50))?;
//! let test = storage.store_matrix("test", &Array2::zeros((200, 50)), (50, 50))?;
//!
//! let config = BaggingConfigBuilder::new()
//!     .n_estimators(10)
//!     .max_samples(10usize)
//!     .max_features(0.5)
//!     .random_seed(42)
//!     .build()?;
//!
//! // Training branch: 5 groups of 2 estimators, each slice 10 x 25.
//! let output = BaggingSample::new(config, storage.clone())?.call(&train, None, None)?;
//! let executor = RayonExecutor::new(0)?;
//! for chunk in output.sampled.collect(&executor)? {
//!     println!("group {}: {} slices", chunk.group, chunk.slices.len());
//! }
//!
//! // Scoring branch: 5 groups x 4 row chunks of the test set.
//! let reindexed = BaggingSampleReindex::new(storage.clone())
//!     .call(&test, output.feature_indices.as_ref())?;
//! assert_eq!(reindexed.chunk_count(), 20);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: index types, constants and error handling
//! - [`config`]: run configuration, file/environment loading and validation
//! - [`dataset`]: the partition model (grids, chunk references, chunk data)
//! - [`storage`]: chunk storage and metadata collaborators
//! - [`sampling`]: estimator grouping and per-estimator sampling plans
//! - [`gather`]: materialization of sampled rows per estimator group
//! - [`reindex`]: projection of another dataset onto a feature plan
//! - [`execution`]: lazy tileable outputs and task executors
//! - [`bagging`]: the caller-facing operations

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Partition model
pub mod dataset;

// Storage collaborators
pub mod storage;

// Sampling planner
pub mod sampling;

// Gather engine
pub mod gather;

// Reindexer
pub mod reindex;

// Task execution
pub mod execution;

// Caller-facing operations
pub mod bagging;

// Re-export core functionality for convenience
pub use crate::core::{
    constants::*,
    error::{BaggingError, Result},
    types::*,
};

// Re-export configuration functionality
pub use config::{
    core::{BaggingConfig, BaggingConfigBuilder},
    validation::{ConfigValidator, ShapeContext, ValidationError, ValidationResult},
};

// Re-export partition model
pub use dataset::{ChunkData, ChunkKey, ChunkRef, Grid, LabeledTable, LogicalDataset, Tabular};

// Re-export storage
pub use storage::{ChunkLocation, ChunkMeta, ChunkMetadata, ChunkStorage, InMemoryStorage};

// Re-export sampling
pub use sampling::{
    EstimatorGroup, EstimatorSample, FeatureIndexChunk, FeatureIndexSet, SamplePlan,
    SamplingPlanner,
};

// Re-export gather and reindex
pub use gather::{EstimatorSlice, GatherEngine, SampledChunk, SampledVector};
pub use reindex::{ReindexCell, ReindexCells, ReindexedChunk, Reindexer};

// Re-export execution
pub use execution::{InlineExecutor, RayonExecutor, TaskExecutor, TaskHandle, Tileable};

// Re-export operations
pub use bagging::{BaggingSample, BaggingSampleOutput, BaggingSampleReindex, FeatureIndexHandle};

// Version information
pub use crate::core::constants::CHUNKED_BAGGING_VERSION as VERSION;

/// Initialize the library.
///
/// Installs `env_logger` as the logging backend (filter taken from
/// `RUST_LOG`, `info` by default). Calling it more than once is harmless.
///
/// # Examples
///
/// ```rust
/// fn main() -> chunked_bagging::Result<()> {
///     chunked_bagging::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    crate::core::initialize_logging();
    Ok(())
}

/// Commonly used types in one import.
pub mod prelude {
    pub use crate::bagging::{
        BaggingSample, BaggingSampleOutput, BaggingSampleReindex, FeatureIndexHandle,
    };
    pub use crate::config::{BaggingConfig, BaggingConfigBuilder};
    pub use crate::core::error::{BaggingError, Result};
    pub use crate::core::types::{DataKind, SampleSize};
    pub use crate::dataset::{ChunkData, LabeledTable, LogicalDataset, Tabular};
    pub use crate::execution::{InlineExecutor, RayonExecutor, TaskExecutor, Tileable};
    pub use crate::storage::{ChunkStorage, InMemoryStorage};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_initialization() {
        assert!(init().is_ok());
        assert!(init().is_ok());
    }

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
    }
}
