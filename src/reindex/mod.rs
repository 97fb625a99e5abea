//! Reindexer: replays per-estimator feature masks onto another dataset.
//!
//! The output is the cross product of the feature plan's estimator groups
//! and the target's row blocks. Without a feature plan the group dimension
//! collapses and every target row block passes through unchanged.

use crate::core::error::{BaggingError, Result};
use crate::core::types::{DataKind, EstimatorId, GridIndex};
use crate::dataset::{ChunkData, ChunkRef, Grid, Tabular};
use crate::gather::layout::ColumnLayout;
use crate::sampling::FeatureIndexSet;
use crate::storage::ChunkStorage;

use std::ops::Range;
use std::sync::Arc;

/// One output cell of a reindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexCell {
    /// Target row block copied unchanged, output index `(row_block, 0)`
    Passthrough {
        /// Target row block
        row_block: usize,
    },
    /// Target row block projected per estimator of a group, output index
    /// `(group, row_block)`
    Project {
        /// Estimator group
        group: usize,
        /// Target row block
        row_block: usize,
    },
}

impl ReindexCell {
    /// Output grid index of the cell
    pub fn index(&self) -> GridIndex {
        match *self {
            ReindexCell::Passthrough { row_block } => (row_block, 0),
            ReindexCell::Project { group, row_block } => (group, row_block),
        }
    }
}

/// Iterator over the `(group, row_block)` cross product, groups outermost.
///
/// With `groups == None` it yields one passthrough cell per row block.
#[derive(Debug, Clone)]
pub struct ReindexCells {
    groups: Option<usize>,
    row_blocks: usize,
    next: usize,
}

impl ReindexCells {
    /// Cells for `groups` estimator groups (or none) over `row_blocks` target blocks
    pub fn new(groups: Option<usize>, row_blocks: usize) -> Self {
        ReindexCells {
            groups,
            row_blocks,
            next: 0,
        }
    }

    fn total(&self) -> usize {
        self.groups.unwrap_or(1) * self.row_blocks
    }
}

impl Iterator for ReindexCells {
    type Item = ReindexCell;

    fn next(&mut self) -> Option<ReindexCell> {
        if self.next >= self.total() {
            return None;
        }
        let i = self.next;
        self.next += 1;
        Some(match self.groups {
            None => ReindexCell::Passthrough { row_block: i },
            Some(_) => ReindexCell::Project {
                group: i / self.row_blocks,
                row_block: i % self.row_blocks,
            },
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ReindexCells {}

/// Content of one reindexed output chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ReindexedChunk {
    /// Target row block, all columns
    Passthrough {
        /// Target row block
        row_block: usize,
        /// Unchanged data
        data: ChunkData,
    },
    /// Target row block restricted to each estimator's features
    Projected {
        /// Estimator group
        group: usize,
        /// Target row block
        row_block: usize,
        /// Estimators of the group
        estimators: Range<EstimatorId>,
        /// One slice per estimator, in estimator order
        slices: Vec<ChunkData>,
    },
}

impl ReindexedChunk {
    /// Output grid index of the chunk
    pub fn index(&self) -> GridIndex {
        match self {
            ReindexedChunk::Passthrough { row_block, .. } => (*row_block, 0),
            ReindexedChunk::Projected {
                group, row_block, ..
            } => (*group, *row_block),
        }
    }

    /// The chunk's data blocks: one for passthrough, one per estimator otherwise
    pub fn slices(&self) -> Vec<&ChunkData> {
        match self {
            ReindexedChunk::Passthrough { data, .. } => vec![data],
            ReindexedChunk::Projected { slices, .. } => slices.iter().collect(),
        }
    }
}

/// Projects target row blocks onto a feature plan.
#[derive(Clone)]
pub struct Reindexer {
    storage: Arc<dyn ChunkStorage>,
    features: Option<Arc<FeatureIndexSet>>,
}

impl std::fmt::Debug for Reindexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reindexer")
            .field("groups", &self.features.as_ref().map(|s| s.group_count()))
            .finish_non_exhaustive()
    }
}

impl Reindexer {
    /// Create a reindexer; `features == None` means no feature plan exists
    pub fn new(storage: Arc<dyn ChunkStorage>, features: Option<Arc<FeatureIndexSet>>) -> Self {
        Reindexer { storage, features }
    }

    /// Whether a feature plan is applied
    pub fn has_feature_plan(&self) -> bool {
        self.features.is_some()
    }

    /// Reject targets that cannot be reindexed.
    ///
    /// The target must be a matrix or table wider than the largest feature
    /// index of the plan.
    pub fn validate_target(&self, target: &Grid) -> Result<()> {
        if target.kind() == DataKind::Vector {
            return Err(BaggingError::shape_mismatch(
                "a matrix or table to reindex",
                format!("vector {}", target.name()),
            ));
        }
        if let Some(max) = self.features.as_ref().and_then(|f| f.max_feature_index()) {
            if target.n_cols() <= max {
                return Err(BaggingError::shape_mismatch(
                    format!("at least {} columns", max + 1),
                    format!("{} columns in {}", target.n_cols(), target.name()),
                ));
            }
        }
        Ok(())
    }

    /// Output cells for `target`, groups outermost
    pub fn cells(&self, target: &Grid) -> ReindexCells {
        ReindexCells::new(
            self.features.as_ref().map(|f| f.group_count()),
            target.row_chunk_count(),
        )
    }

    /// `(rows, cols)` of the output grid
    pub fn output_grid_shape(&self, target: &Grid) -> (usize, usize) {
        match &self.features {
            None => (target.row_chunk_count(), 1),
            Some(features) => (features.group_count(), target.row_chunk_count()),
        }
    }

    /// Compute one output cell
    pub fn reindex_cell(&self, cell: ReindexCell, target: &Grid) -> Result<ReindexedChunk> {
        let fetch = |chunk: &ChunkRef| self.storage.fetch(chunk);
        match cell {
            ReindexCell::Passthrough { row_block } => {
                let data = ColumnLayout::all(target).fetch_row_block(row_block, &fetch)?;
                log::debug!("reindex passthrough of {} row block {}", target.name(), row_block);
                Ok(ReindexedChunk::Passthrough { row_block, data })
            }
            ReindexCell::Project { group, row_block } => {
                let features = self.features.as_ref().ok_or_else(|| {
                    BaggingError::internal("projection requested without a feature plan")
                })?;
                let chunk = features.chunk(group)?;
                let cols = ColumnLayout::covering(target, chunk.indices.iter().copied())?;
                let stitched: ChunkData = cols.fetch_row_block(row_block, &fetch)?;

                let slices = (0..chunk.estimators.len())
                    .map(|i| {
                        let selected = chunk.estimator_features(i)?.to_vec();
                        stitched.take_cols(&cols.positions(&selected)?)
                    })
                    .collect::<Result<Vec<_>>>()?;

                log::debug!(
                    "reindexed {} row block {} for group {} ({} estimators)",
                    target.name(),
                    row_block,
                    group,
                    slices.len()
                );
                Ok(ReindexedChunk::Projected {
                    group,
                    row_block,
                    estimators: chunk.estimators.clone(),
                    slices,
                })
            }
        }
    }
}
