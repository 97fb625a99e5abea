//! Caller-facing sampling and reindexing operations.
//!
//! [`BaggingSample`] plans a run and returns lazy handles for the sampled
//! data, labels, weights and feature indices. [`BaggingSampleReindex`] replays
//! a feature index handle onto another dataset. Shape and configuration
//! errors are returned synchronously; nothing is fetched until a handle is
//! executed.
//!
//! ```no_run
//! use chunked_bagging::prelude::*;
//! use ndarray::Array2;
//! use std::sync::Arc;
//!
//! # fn main() -> chunked_bagging::Result<()> {
//! let storage = Arc::new(InMemoryStorage::new());
//! let data = storage.store_matrix("x", &Array2::zeros((100, 50)), (20, 50))?;
//!
//! let config = BaggingConfigBuilder::new()
//!     .n_estimators(10)
//!     .max_samples(10usize)
//!     .max_features(0.5)
//!     .random_seed(0)
//!     .build()?;
//! let output = BaggingSample::new(config, storage.clone())?.call(&data, None, None)?;
//! let sampled = output.sampled.collect(&InlineExecutor)?;
//! assert_eq!(sampled.len(), 5);
//! # Ok(())
//! # }
//! ```

use crate::config::BaggingConfig;
use crate::core::error::Result;
use crate::dataset::{Grid, LogicalDataset};
use crate::execution::{ChunkTask, Tileable};
use crate::gather::{GatherEngine, SampledChunk, SampledVector};
use crate::reindex::{ReindexedChunk, Reindexer};
use crate::sampling::{FeatureIndexChunk, FeatureIndexSet, SamplePlan, SamplingPlanner};
use crate::storage::ChunkStorage;

use rand::RngCore;
use std::path::Path;
use std::sync::Arc;

/// Handle to the feature indices of a plan.
#[derive(Debug, Clone)]
pub struct FeatureIndexHandle {
    set: Arc<FeatureIndexSet>,
}

impl FeatureIndexHandle {
    /// Wrap a feature index set after validating it
    pub fn new(set: FeatureIndexSet) -> Result<Self> {
        set.validate()?;
        Ok(FeatureIndexHandle { set: Arc::new(set) })
    }

    /// The underlying set
    pub fn set(&self) -> &FeatureIndexSet {
        &self.set
    }

    /// Number of estimator groups
    pub fn group_count(&self) -> usize {
        self.set.group_count()
    }

    /// One chunk per group at grid index `(group, 0)`
    pub fn tileable(&self) -> Tileable<FeatureIndexChunk> {
        let chunks = (0..self.set.group_count())
            .map(|g| {
                let set = Arc::clone(&self.set);
                let task: ChunkTask<FeatureIndexChunk> = Arc::new(move || set.chunk(g).cloned());
                ((g, 0), task)
            })
            .collect();
        Tileable::new("feature_indices", (self.set.group_count(), 1), chunks)
    }

    /// Persist the feature indices, see [`FeatureIndexSet::save_to_file`]
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.set.save_to_file(path)
    }

    /// Load feature indices saved by [`FeatureIndexHandle::save_to_file`]
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(FeatureIndexHandle {
            set: Arc::new(FeatureIndexSet::load_from_file(path)?),
        })
    }
}

/// Lazy outputs of [`BaggingSample::call`].
#[derive(Debug)]
pub struct BaggingSampleOutput {
    /// The plan every handle was built from
    pub plan: Arc<SamplePlan>,
    /// Sampled data, one chunk per group at `(group, 0)`
    pub sampled: Tileable<SampledChunk>,
    /// Sampled labels, when labels were supplied
    pub labels: Option<Tileable<SampledVector>>,
    /// Sampled weights, when weights were supplied
    pub weights: Option<Tileable<SampledVector>>,
    /// Feature indices, when features are subsampled
    pub feature_indices: Option<FeatureIndexHandle>,
}

/// Plans a bagging run over a chunked dataset.
#[derive(Clone)]
pub struct BaggingSample {
    planner: SamplingPlanner,
    storage: Arc<dyn ChunkStorage>,
}

impl std::fmt::Debug for BaggingSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaggingSample")
            .field("planner", &self.planner)
            .finish_non_exhaustive()
    }
}

impl BaggingSample {
    /// Create the operation, rejecting invalid configurations
    pub fn new(config: BaggingConfig, storage: Arc<dyn ChunkStorage>) -> Result<Self> {
        Ok(BaggingSample {
            planner: SamplingPlanner::new(config)?,
            storage,
        })
    }

    /// Take the base seed from a caller-owned generator
    pub fn with_rng<R: RngCore + ?Sized>(mut self, rng: &mut R) -> Self {
        self.planner = self.planner.with_rng(rng);
        self
    }

    /// Plan without building any handle
    pub fn plan(&self, data: &LogicalDataset) -> Result<SamplePlan> {
        self.planner.plan_for(&data.partition())
    }

    /// Plan the run and return lazy handles for its outputs.
    ///
    /// Labels and weights must be vectors with one entry per row of `data`;
    /// they may be chunked differently from `data`.
    pub fn call(
        &self,
        data: &LogicalDataset,
        labels: Option<&LogicalDataset>,
        weights: Option<&LogicalDataset>,
    ) -> Result<BaggingSampleOutput> {
        let data_grid = Arc::new(data.partition());
        let label_grid = labels.map(|l| Arc::new(l.partition()));
        let weight_grid = weights.map(|w| Arc::new(w.partition()));

        let plan = Arc::new(self.planner.plan_for(&data_grid)?);
        GatherEngine::check_inputs(
            &plan,
            &data_grid,
            label_grid.as_deref(),
            weight_grid.as_deref(),
        )?;

        let engine = GatherEngine::new(Arc::clone(&self.storage));
        let group_count = plan.group_count();

        let sampled_chunks = (0..group_count)
            .map(|g| {
                let (engine, plan, grid) = (engine.clone(), Arc::clone(&plan), Arc::clone(&data_grid));
                let task: ChunkTask<SampledChunk> =
                    Arc::new(move || engine.gather_data(&plan, g, &grid));
                ((g, 0), task)
            })
            .collect();
        let sampled = Tileable::new(
            format!("{}_sampled", data.name()),
            (group_count, 1),
            sampled_chunks,
        );

        let vector_tileable = |grid: Arc<Grid>| {
            let chunks = (0..group_count)
                .map(|g| {
                    let (engine, plan, grid) = (engine.clone(), Arc::clone(&plan), Arc::clone(&grid));
                    let task: ChunkTask<SampledVector> =
                        Arc::new(move || engine.gather_vector(&plan, g, &grid));
                    ((g, 0), task)
                })
                .collect();
            Tileable::new(format!("{}_sampled", grid.name()), (group_count, 1), chunks)
        };

        let feature_indices = match plan.feature_index_set()? {
            Some(set) => Some(FeatureIndexHandle::new(set)?),
            None => None,
        };

        Ok(BaggingSampleOutput {
            labels: label_grid.map(&vector_tileable),
            weights: weight_grid.map(&vector_tileable),
            plan,
            sampled,
            feature_indices,
        })
    }
}

/// Replays feature indices onto another chunked dataset.
#[derive(Clone)]
pub struct BaggingSampleReindex {
    storage: Arc<dyn ChunkStorage>,
}

impl std::fmt::Debug for BaggingSampleReindex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaggingSampleReindex").finish_non_exhaustive()
    }
}

impl BaggingSampleReindex {
    /// Create the operation reading targets from `storage`
    pub fn new(storage: Arc<dyn ChunkStorage>) -> Self {
        BaggingSampleReindex { storage }
    }

    /// Build the reindexed handle for `target`.
    ///
    /// Without feature indices the output has one passthrough chunk per
    /// target row block at `(row_block, 0)`. Otherwise it has one chunk per
    /// `(group, row_block)` pair.
    pub fn call(
        &self,
        target: &LogicalDataset,
        features: Option<&FeatureIndexHandle>,
    ) -> Result<Tileable<ReindexedChunk>> {
        let grid = Arc::new(target.partition());
        let reindexer = Reindexer::new(
            Arc::clone(&self.storage),
            features.map(|f| Arc::clone(&f.set)),
        );
        reindexer.validate_target(&grid)?;

        let chunks: Vec<_> = reindexer
            .cells(&grid)
            .map(|cell| {
                let (reindexer, grid) = (reindexer.clone(), Arc::clone(&grid));
                let task: ChunkTask<ReindexedChunk> =
                    Arc::new(move || reindexer.reindex_cell(cell, &grid));
                (cell.index(), task)
            })
            .collect();

        log::info!(
            "reindexing {} into {} chunks{}",
            target.name(),
            chunks.len(),
            if reindexer.has_feature_plan() {
                ""
            } else {
                " (passthrough)"
            }
        );
        Ok(Tileable::new(
            format!("{}_reindexed", target.name()),
            reindexer.output_grid_shape(&grid),
            chunks,
        ))
    }
}
