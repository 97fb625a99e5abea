//! Per-group feature index matrices and their persisted form.

use crate::core::error::{BaggingError, Result};
use crate::core::types::{EstimatorId, FeatureIndex};

use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::ops::Range;
use std::path::Path;

/// Feature indices selected by the estimators of one group.
///
/// Row `i` of `indices` lists, in ascending order, the source columns kept by
/// estimator `estimators.start + i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureIndexChunk {
    /// Group this chunk belongs to
    pub group: usize,
    /// Estimators of the group
    pub estimators: Range<EstimatorId>,
    /// `(estimators, features_per_estimator)` matrix of column indices
    pub indices: Array2<FeatureIndex>,
}

impl FeatureIndexChunk {
    /// `(estimators, features_per_estimator)`
    pub fn shape(&self) -> (usize, usize) {
        self.indices.dim()
    }

    /// Columns kept by the `i`-th estimator of the group
    pub fn estimator_features(&self, i: usize) -> Result<ArrayView1<'_, FeatureIndex>> {
        if i >= self.indices.nrows() {
            return Err(BaggingError::index_out_of_range(
                i,
                self.indices.nrows(),
                format!("estimators of group {}", self.group),
            ));
        }
        Ok(self.indices.index_axis(Axis(0), i))
    }

    /// Largest column index referenced
    pub fn max_index(&self) -> Option<FeatureIndex> {
        self.indices.iter().copied().max()
    }
}

/// The feature index chunks of every group of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureIndexSet {
    /// Column count of the dataset the features were sampled from
    pub n_source_cols: usize,
    /// When the plan was built
    pub created_at: DateTime<Utc>,
    /// One chunk per group, in group order
    pub chunks: Vec<FeatureIndexChunk>,
}

impl FeatureIndexSet {
    /// Assemble a set, checking group order and index bounds
    pub fn new(n_source_cols: usize, chunks: Vec<FeatureIndexChunk>) -> Result<Self> {
        let set = FeatureIndexSet {
            n_source_cols,
            created_at: Utc::now(),
            chunks,
        };
        set.validate()?;
        Ok(set)
    }

    /// Check that groups exist and their numbering, uniform width and index bounds
    pub fn validate(&self) -> Result<()> {
        if self.chunks.is_empty() {
            return Err(BaggingError::shape_mismatch(
                "at least one estimator group",
                "an empty feature index set",
            ));
        }
        let width = self.chunks.first().map(|c| c.shape().1);
        for (g, chunk) in self.chunks.iter().enumerate() {
            if chunk.group != g {
                return Err(BaggingError::internal(format!(
                    "feature chunk {} is labeled as group {}",
                    g, chunk.group
                )));
            }
            if chunk.estimators.len() != chunk.indices.nrows() {
                return Err(BaggingError::shape_mismatch(
                    format!("{} estimator rows", chunk.estimators.len()),
                    format!("{} rows in group {}", chunk.indices.nrows(), g),
                ));
            }
            if Some(chunk.shape().1) != width {
                return Err(BaggingError::shape_mismatch(
                    format!("{} features per estimator", width.unwrap_or(0)),
                    format!("{} in group {}", chunk.shape().1, g),
                ));
            }
            if let Some(max) = chunk.max_index() {
                if max >= self.n_source_cols {
                    return Err(BaggingError::index_out_of_range(
                        max,
                        self.n_source_cols,
                        format!("feature indices of group {}", g),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Number of groups
    pub fn group_count(&self) -> usize {
        self.chunks.len()
    }

    /// Features kept by each estimator
    pub fn features_per_estimator(&self) -> usize {
        self.chunks.first().map_or(0, |c| c.shape().1)
    }

    /// Total estimators across groups
    pub fn n_estimators(&self) -> usize {
        self.chunks.iter().map(|c| c.estimators.len()).sum()
    }

    /// Chunk of group `g`
    pub fn chunk(&self, g: usize) -> Result<&FeatureIndexChunk> {
        self.chunks.get(g).ok_or_else(|| {
            BaggingError::index_out_of_range(g, self.chunks.len(), "feature index groups")
        })
    }

    /// Largest column index referenced by any group
    pub fn max_feature_index(&self) -> Option<FeatureIndex> {
        self.chunks.iter().filter_map(|c| c.max_index()).max()
    }

    /// Save to `path`; `.json` writes JSON, anything else bincode
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            bincode::serialize_into(writer, self)?;
        }
        log::debug!(
            "saved feature indices of {} groups to {}",
            self.group_count(),
            path.display()
        );
        Ok(())
    }

    /// Load from `path`; `.json` reads JSON, anything else bincode
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let set: FeatureIndexSet = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            bincode::deserialize_from(reader)?
        };
        set.validate()?;
        Ok(set)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}
