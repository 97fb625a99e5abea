//! Gather engine: materializes the sampled rows of each estimator group.
//!
//! For a group the engine locates every sampled row with a binary search on
//! the source grid, fetches each needed chunk exactly once, stitches the
//! fetched blocks and then takes rows in sample order (repeats included)
//! before projecting to the estimator's features. Labels and weights are
//! gathered with the same row sequences from their own grids.

pub(crate) mod layout;

use crate::core::error::{BaggingError, Result};
use crate::core::types::{DataKind, EstimatorId, Value};
use crate::dataset::{ChunkData, ChunkRef, Grid, Tabular};
use crate::sampling::{EstimatorSample, SamplePlan};
use crate::storage::ChunkStorage;

use self::layout::{ColumnLayout, RowLayout};

use ndarray::Array1;
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

/// Sampled data of one estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorSlice {
    /// Estimator id
    pub estimator_id: EstimatorId,
    /// `(sample_size, feature_count)` rows in sample order
    pub data: ChunkData,
    /// Labels of the same rows
    pub labels: Option<Array1<Value>>,
    /// Weights of the same rows
    pub weights: Option<Array1<Value>>,
}

/// Sampled data of every estimator of one group, in estimator order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledChunk {
    /// Group index
    pub group: usize,
    /// One slice per estimator
    pub slices: Vec<EstimatorSlice>,
}

/// Sampled label or weight vectors of one group, in estimator order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledVector {
    /// Group index
    pub group: usize,
    /// Estimators of the group
    pub estimators: Range<EstimatorId>,
    /// One vector of length `sample_size` per estimator
    pub values: Vec<Array1<Value>>,
}

/// Assembles per-estimator samples from chunked storage.
#[derive(Clone)]
pub struct GatherEngine {
    storage: Arc<dyn ChunkStorage>,
}

impl std::fmt::Debug for GatherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatherEngine").finish_non_exhaustive()
    }
}

impl GatherEngine {
    /// Create an engine reading from `storage`
    pub fn new(storage: Arc<dyn ChunkStorage>) -> Self {
        GatherEngine { storage }
    }

    /// Check that the data grid matches the plan and that label and weight
    /// grids are vectors of the same row count.
    pub fn check_inputs(
        plan: &SamplePlan,
        data: &Grid,
        labels: Option<&Grid>,
        weights: Option<&Grid>,
    ) -> Result<()> {
        if data.shape() != plan.shape() {
            return Err(BaggingError::shape_mismatch(
                format!("dataset of shape {:?}", plan.shape()),
                format!("{} of shape {:?}", data.name(), data.shape()),
            ));
        }
        if data.kind() == DataKind::Vector {
            return Err(BaggingError::shape_mismatch(
                "a matrix or table to sample from",
                format!("vector {}", data.name()),
            ));
        }
        for (role, grid) in [("labels", labels), ("weights", weights)] {
            if let Some(grid) = grid {
                check_vector(role, grid, plan.shape().0)?;
            }
        }
        Ok(())
    }

    /// Sampled data slices of group `g` (labels and weights left empty)
    pub fn gather_data(&self, plan: &SamplePlan, g: usize, data: &Grid) -> Result<SampledChunk> {
        let samples = plan.samples_in_group(g)?;
        let fetch = |chunk: &ChunkRef| self.storage.fetch(chunk);
        let sliced = gather_rows(data, samples, &fetch)?;

        let slices = samples
            .iter()
            .zip(sliced)
            .map(|(sample, data)| EstimatorSlice {
                estimator_id: sample.estimator_id,
                data,
                labels: None,
                weights: None,
            })
            .collect();
        Ok(SampledChunk { group: g, slices })
    }

    /// Sampled vectors of group `g` from the label or weight grid `vector`
    pub fn gather_vector(&self, plan: &SamplePlan, g: usize, vector: &Grid) -> Result<SampledVector> {
        check_vector(vector.name(), vector, plan.shape().0)?;
        let group = plan.group(g)?;
        let samples = plan.samples_in_group(g)?;
        let fetch = |chunk: &ChunkRef| -> Result<Array1<Value>> {
            self.storage.fetch(chunk)?.into_vector()
        };
        let values = gather_rows(vector, samples, &fetch)?;
        Ok(SampledVector {
            group: g,
            estimators: group.estimators.clone(),
            values,
        })
    }

    /// Sampled data, labels and weights of group `g` in one chunk
    pub fn gather_group(
        &self,
        plan: &SamplePlan,
        g: usize,
        data: &Grid,
        labels: Option<&Grid>,
        weights: Option<&Grid>,
    ) -> Result<SampledChunk> {
        Self::check_inputs(plan, data, labels, weights)?;
        let mut chunk = self.gather_data(plan, g, data)?;

        if let Some(labels) = labels {
            let gathered = self.gather_vector(plan, g, labels)?;
            for (slice, values) in chunk.slices.iter_mut().zip(gathered.values) {
                slice.labels = Some(values);
            }
        }
        if let Some(weights) = weights {
            let gathered = self.gather_vector(plan, g, weights)?;
            for (slice, values) in chunk.slices.iter_mut().zip(gathered.values) {
                slice.weights = Some(values);
            }
        }
        Ok(chunk)
    }
}

fn check_vector(role: &str, grid: &Grid, n_rows: usize) -> Result<()> {
    if grid.kind() != DataKind::Vector {
        return Err(BaggingError::shape_mismatch(
            format!("{} as a vector", role),
            format!("{} {}", grid.kind(), grid.name()),
        ));
    }
    if grid.n_rows() != n_rows {
        return Err(BaggingError::shape_mismatch(
            format!("{} of length {}", role, n_rows),
            format!("length {}", grid.n_rows()),
        ));
    }
    Ok(())
}

/// Gather the rows of every sample from `grid`, projecting to each sample's
/// features when the source has columns to select.
fn gather_rows<T, F>(grid: &Grid, samples: &[EstimatorSample], fetch: &F) -> Result<Vec<T>>
where
    T: Tabular,
    F: Fn(&ChunkRef) -> Result<T>,
{
    let rows = RowLayout::new(grid, samples.iter().map(|s| s.rows.as_slice()))?;

    let project = grid.kind() != DataKind::Vector;
    let selected: Option<BTreeSet<usize>> = if project {
        samples
            .iter()
            .map(|s| s.features.as_ref())
            .collect::<Option<Vec<_>>>()
            .map(|features| features.into_iter().flatten().copied().collect())
    } else {
        None
    };
    let cols = match &selected {
        Some(selected) => ColumnLayout::covering(grid, selected.iter().copied())?,
        None => ColumnLayout::all(grid),
    };

    log::debug!(
        "gathering {} estimators from {}: {} of {} row blocks, {} of {} column blocks",
        samples.len(),
        grid.name(),
        rows.blocks().len(),
        grid.row_chunk_count(),
        cols.blocks().len(),
        grid.col_chunk_count()
    );

    let parts = rows
        .blocks()
        .iter()
        .map(|&r| cols.fetch_row_block(r, fetch))
        .collect::<Result<Vec<T>>>()?;
    let stitched = T::concat_rows(&parts)?;

    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let sliced = stitched.take_rows(rows.positions(i))?;
            match (&sample.features, project) {
                (Some(features), true) => sliced.take_cols(&cols.positions(features)?),
                _ => Ok(sliced),
            }
        })
        .collect()
}
