//! Estimator grouping and per-estimator row/feature sampling.
//!
//! The planner is pure: given a dataset shape, its row chunk count and a
//! [`BaggingConfig`] it produces an immutable [`SamplePlan`]. Each estimator's
//! draws come from its own substream (see [`crate::sampling::rng`]), so the
//! plan does not depend on grouping, chunking or the number of threads used
//! to compute it.

use crate::config::{BaggingConfig, ConfigValidator, ShapeContext};
use crate::core::error::{BaggingError, Result};
use crate::core::types::{EstimatorId, FeatureIndex, RowIndex};
use crate::dataset::Grid;
use crate::sampling::features::{FeatureIndexChunk, FeatureIndexSet};
use crate::sampling::rng::{draw_base_seed, entropy_seed, estimator_rng};

use ndarray::Array2;
use rand::seq::index;
use rand::{Rng, RngCore};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Estimators assigned to one output task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorGroup {
    /// Group index (output grid row)
    pub index: usize,
    /// Contiguous estimator ids of the group
    pub estimators: Range<EstimatorId>,
}

impl EstimatorGroup {
    /// Number of estimators in the group
    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }
}

/// Split `n_estimators` into `min(n_estimators, row_chunk_count)` contiguous
/// groups whose sizes differ by at most one, larger groups first.
pub fn assign_groups(n_estimators: usize, row_chunk_count: usize) -> Vec<EstimatorGroup> {
    let group_count = n_estimators.min(row_chunk_count);
    if group_count == 0 {
        return Vec::new();
    }
    let base = n_estimators / group_count;
    let extra = n_estimators % group_count;

    let mut start = 0;
    (0..group_count)
        .map(|index| {
            let size = base + usize::from(index < extra);
            let group = EstimatorGroup {
                index,
                estimators: start..start + size,
            };
            start += size;
            group
        })
        .collect()
}

/// Row and feature draws of one estimator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorSample {
    /// Estimator id
    pub estimator_id: EstimatorId,
    /// Sampled rows in draw order, possibly repeated
    pub rows: Vec<RowIndex>,
    /// Selected columns in ascending order, `None` without a feature plan
    pub features: Option<Vec<FeatureIndex>>,
}

/// Draw the sample of one estimator from its own substream.
///
/// Rows are drawn first, then features. Without replacement `sample_size`
/// must not exceed `n_rows`.
pub fn sample_estimator(
    base_seed: u64,
    estimator_id: EstimatorId,
    shape: (usize, usize),
    sample_size: usize,
    feature_count: Option<usize>,
    bootstrap: bool,
) -> EstimatorSample {
    let (n_rows, n_cols) = shape;
    let mut rng = estimator_rng(base_seed, estimator_id);

    let rows = if bootstrap {
        (0..sample_size).map(|_| rng.gen_range(0..n_rows)).collect()
    } else {
        index::sample(&mut rng, n_rows, sample_size).into_vec()
    };

    let features = feature_count.map(|count| {
        let mut features = index::sample(&mut rng, n_cols, count).into_vec();
        features.sort_unstable();
        features
    });

    EstimatorSample {
        estimator_id,
        rows,
        features,
    }
}

/// Immutable sampling plan for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePlan {
    n_rows: usize,
    n_cols: usize,
    base_seed: u64,
    bootstrap: bool,
    sample_size: usize,
    feature_count: Option<usize>,
    groups: Vec<EstimatorGroup>,
    samples: Vec<EstimatorSample>,
}

impl SamplePlan {
    /// `(n_rows, n_cols)` of the planned dataset
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Base seed the substreams derive from
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Whether rows were drawn with replacement
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    /// Rows drawn per estimator
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Features kept per estimator, `None` without a feature plan
    pub fn feature_count(&self) -> Option<usize> {
        self.feature_count
    }

    /// Whether estimators select feature subsets
    pub fn has_feature_plan(&self) -> bool {
        self.feature_count.is_some()
    }

    /// Total estimators
    pub fn n_estimators(&self) -> usize {
        self.samples.len()
    }

    /// Estimator groups in order
    pub fn groups(&self) -> &[EstimatorGroup] {
        &self.groups
    }

    /// Number of groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Group `g`
    pub fn group(&self, g: usize) -> Result<&EstimatorGroup> {
        self.groups
            .get(g)
            .ok_or_else(|| BaggingError::index_out_of_range(g, self.groups.len(), "estimator groups"))
    }

    /// Sample of estimator `id`
    pub fn estimator(&self, id: EstimatorId) -> Result<&EstimatorSample> {
        self.samples
            .get(id)
            .ok_or_else(|| BaggingError::index_out_of_range(id, self.samples.len(), "estimators"))
    }

    /// Samples of the estimators of group `g`, in estimator order
    pub fn samples_in_group(&self, g: usize) -> Result<&[EstimatorSample]> {
        let group = self.group(g)?;
        Ok(&self.samples[group.estimators.clone()])
    }

    /// Feature index matrix of group `g`, `None` without a feature plan
    pub fn feature_index_chunk(&self, g: usize) -> Result<Option<FeatureIndexChunk>> {
        let count = match self.feature_count {
            Some(count) => count,
            None => return Ok(None),
        };
        let group = self.group(g)?;
        let samples = self.samples_in_group(g)?;

        let mut flat = Vec::with_capacity(samples.len() * count);
        for sample in samples {
            let features = sample.features.as_ref().ok_or_else(|| {
                BaggingError::internal(format!(
                    "estimator {} has no features in a feature plan",
                    sample.estimator_id
                ))
            })?;
            flat.extend_from_slice(features);
        }
        let indices = Array2::from_shape_vec((samples.len(), count), flat)?;

        Ok(Some(FeatureIndexChunk {
            group: group.index,
            estimators: group.estimators.clone(),
            indices,
        }))
    }

    /// Feature index matrices of all groups, `None` without a feature plan
    pub fn feature_index_set(&self) -> Result<Option<FeatureIndexSet>> {
        if !self.has_feature_plan() {
            return Ok(None);
        }
        let mut chunks = Vec::with_capacity(self.groups.len());
        for g in 0..self.groups.len() {
            if let Some(chunk) = self.feature_index_chunk(g)? {
                chunks.push(chunk);
            }
        }
        FeatureIndexSet::new(self.n_cols, chunks).map(Some)
    }

    /// Check every sampled index against the planned shape.
    ///
    /// A failure here is a planner bug and reported as fatal.
    pub fn validate(&self) -> Result<()> {
        for sample in &self.samples {
            if sample.rows.len() != self.sample_size {
                return Err(BaggingError::internal(format!(
                    "estimator {} drew {} rows instead of {}",
                    sample.estimator_id,
                    sample.rows.len(),
                    self.sample_size
                )));
            }
            if let Some(&row) = sample.rows.iter().find(|&&r| r >= self.n_rows) {
                return Err(BaggingError::index_out_of_range(
                    row,
                    self.n_rows,
                    format!("rows sampled by estimator {}", sample.estimator_id),
                ));
            }
            if let Some(features) = &sample.features {
                if let Some(&col) = features.iter().find(|&&c| c >= self.n_cols) {
                    return Err(BaggingError::index_out_of_range(
                        col,
                        self.n_cols,
                        format!("features selected by estimator {}", sample.estimator_id),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Builds [`SamplePlan`]s from a [`BaggingConfig`].
#[derive(Debug, Clone)]
pub struct SamplingPlanner {
    config: BaggingConfig,
    base_seed: Option<u64>,
}

impl SamplingPlanner {
    /// Create a planner, rejecting invalid parameters
    pub fn new(config: BaggingConfig) -> Result<Self> {
        config.validate()?;
        let base_seed = config.random_seed;
        Ok(SamplingPlanner { config, base_seed })
    }

    /// Take the base seed from a caller-owned generator.
    ///
    /// Overrides `random_seed` of the configuration.
    pub fn with_rng<R: RngCore + ?Sized>(mut self, rng: &mut R) -> Self {
        self.base_seed = Some(draw_base_seed(rng));
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &BaggingConfig {
        &self.config
    }

    /// Plan for a dataset of `shape` split into `row_chunk_count` row chunks
    pub fn plan(&self, shape: (usize, usize), row_chunk_count: usize) -> Result<SamplePlan> {
        let (n_rows, n_cols) = shape;
        ConfigValidator::new()
            .with_shape(ShapeContext {
                n_rows,
                n_cols,
                row_chunks: row_chunk_count,
            })
            .check(&self.config)?;
        if row_chunk_count == 0 {
            return Err(BaggingError::shape_mismatch(
                "at least one row chunk",
                "no row chunks",
            ));
        }

        let base_seed = match self.base_seed {
            Some(seed) => seed,
            None => {
                let seed = entropy_seed();
                log::debug!("no random seed configured, drew base seed {}", seed);
                seed
            }
        };

        let sample_size = self.config.max_samples.resolve_rows(n_rows);
        let feature_count = self.config.max_features.resolve_features(n_cols);
        let bootstrap = self.config.bootstrap;
        let groups = assign_groups(self.config.n_estimators, row_chunk_count);

        let samples: Vec<EstimatorSample> = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|id| sample_estimator(base_seed, id, shape, sample_size, feature_count, bootstrap))
            .collect();

        let plan = SamplePlan {
            n_rows,
            n_cols,
            base_seed,
            bootstrap,
            sample_size,
            feature_count,
            groups,
            samples,
        };
        if self.config.validate_plan {
            plan.validate()?;
        }

        log::info!(
            "planned {} estimators in {} groups: {} rows each{}",
            plan.n_estimators(),
            plan.group_count(),
            sample_size,
            match feature_count {
                Some(count) => format!(", {} of {} features", count, n_cols),
                None => String::new(),
            }
        );
        Ok(plan)
    }

    /// Plan for the dataset laid out by `grid`
    pub fn plan_for(&self, grid: &Grid) -> Result<SamplePlan> {
        self.plan(grid.shape(), grid.row_chunk_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BaggingConfigBuilder;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn planner(max_samples: usize, max_features: f64, seed: u64) -> SamplingPlanner {
        let config = BaggingConfigBuilder::new()
            .n_estimators(10)
            .max_samples(max_samples)
            .max_features(max_features)
            .random_seed(seed)
            .build()
            .unwrap();
        SamplingPlanner::new(config).unwrap()
    }

    #[test]
    fn test_group_assignment() {
        let groups = assign_groups(10, 5);
        assert_eq!(groups.len(), 5);
        assert!(groups.iter().all(|g| g.len() == 2));

        let groups = assign_groups(7, 3);
        let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
        assert_eq!(groups[1].estimators, 3..5);
        assert_eq!(groups[2].estimators, 5..7);

        let groups = assign_groups(3, 8);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn test_plan_shapes() {
        let plan = planner(10, 0.5, 0).plan((100, 50), 5).unwrap();
        assert_eq!(plan.group_count(), 5);
        assert_eq!(plan.n_estimators(), 10);
        assert_eq!(plan.sample_size(), 10);
        assert_eq!(plan.feature_count(), Some(25));

        for g in 0..plan.group_count() {
            let chunk = plan.feature_index_chunk(g).unwrap().unwrap();
            assert_eq!(chunk.shape(), (2, 25));
        }
        for id in 0..10 {
            let sample = plan.estimator(id).unwrap();
            assert_eq!(sample.rows.len(), 10);
            assert!(sample.rows.iter().all(|&r| r < 100));
            let features = sample.features.as_ref().unwrap();
            assert!(features.windows(2).all(|w| w[0] < w[1]));
            assert!(features.iter().all(|&c| c < 50));
        }
    }

    #[test]
    fn test_no_feature_plan() {
        let plan = planner(10, 1.0, 0).plan((100, 50), 5).unwrap();
        assert!(!plan.has_feature_plan());
        assert!(plan.feature_index_chunk(0).unwrap().is_none());
        assert!(plan.feature_index_set().unwrap().is_none());
        assert!(plan.estimator(0).unwrap().features.is_none());
    }

    #[test]
    fn test_plan_independent_of_chunking() {
        let p = planner(10, 0.5, 1234);
        let five = p.plan((100, 50), 5).unwrap();
        let two = p.plan((100, 50), 2).unwrap();
        assert_eq!(two.group_count(), 2);
        for id in 0..10 {
            assert_eq!(five.estimator(id).unwrap(), two.estimator(id).unwrap());
        }
    }

    #[test]
    fn test_with_rng_is_reproducible() {
        let config = BaggingConfigBuilder::new().max_samples(5usize).build().unwrap();
        let a = SamplingPlanner::new(config.clone())
            .unwrap()
            .with_rng(&mut StdRng::seed_from_u64(3))
            .plan((20, 4), 2)
            .unwrap();
        let b = SamplingPlanner::new(config)
            .unwrap()
            .with_rng(&mut StdRng::seed_from_u64(3))
            .plan((20, 4), 2)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sampling_without_replacement() {
        let config = BaggingConfigBuilder::new()
            .n_estimators(4)
            .max_samples(20usize)
            .bootstrap(false)
            .random_seed(5)
            .build()
            .unwrap();
        let plan = SamplingPlanner::new(config).unwrap().plan((20, 3), 4).unwrap();
        for id in 0..4 {
            let rows: HashSet<_> = plan.estimator(id).unwrap().rows.iter().copied().collect();
            assert_eq!(rows.len(), 20);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let p = planner(10, 0.5, 0);
        assert!(matches!(
            p.plan((0, 50), 1),
            Err(BaggingError::Configuration { .. })
        ));

        let config = BaggingConfigBuilder::new()
            .max_samples(30usize)
            .bootstrap(false)
            .build()
            .unwrap();
        assert!(SamplingPlanner::new(config).unwrap().plan((20, 3), 2).is_err());

        let mut config = BaggingConfig::default();
        config.n_estimators = 0;
        assert!(SamplingPlanner::new(config).is_err());
    }

    #[test]
    fn test_huge_sample_size_is_a_configuration_error() {
        let config = BaggingConfigBuilder::new()
            .max_samples(1e30)
            .random_seed(0)
            .build()
            .unwrap();
        assert!(matches!(
            SamplingPlanner::new(config).unwrap().plan((10, 2), 1),
            Err(BaggingError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_catches_bad_indices() {
        let mut plan = planner(10, 0.5, 0).plan((100, 50), 5).unwrap();
        plan.samples[3].rows[0] = 100;
        assert!(matches!(
            plan.validate(),
            Err(BaggingError::IndexOutOfRange { index: 100, bound: 100, .. })
        ));
    }
}
