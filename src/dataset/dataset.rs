//! Logical (chunked, not materialized) datasets.

use crate::core::error::{BaggingError, Result};
use crate::core::types::DataKind;
use crate::dataset::grid::{ChunkKey, Grid};
use crate::storage::ChunkMetadata;

use serde::{Deserialize, Serialize};

/// A chunked dataset described by its name, kind and chunk layout.
///
/// Holds no data. Chunk content is looked up through storage by the keys of
/// the grid returned from [`LogicalDataset::partition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalDataset {
    grid: Grid,
}

impl LogicalDataset {
    /// Describe a dataset by its block sizes along each axis.
    ///
    /// Rejects empty datasets and malformed layouts.
    pub fn new(
        name: impl Into<String>,
        kind: DataKind,
        row_splits: Vec<usize>,
        col_splits: Vec<usize>,
    ) -> Result<Self> {
        let grid = Grid::from_splits(&name.into(), kind, &row_splits, &col_splits)?;
        Ok(LogicalDataset { grid })
    }

    /// Describe a dataset of `shape` chunked into blocks of at most `chunk_shape`
    pub fn with_chunk_shape(
        name: impl Into<String>,
        kind: DataKind,
        shape: (usize, usize),
        chunk_shape: (usize, usize),
    ) -> Result<Self> {
        let row_splits = crate::dataset::grid::uniform_splits(shape.0, chunk_shape.0);
        let col_splits = match kind {
            DataKind::Vector => vec![1],
            _ => crate::dataset::grid::uniform_splits(shape.1, chunk_shape.1),
        };
        Self::new(name, kind, row_splits, col_splits)
    }

    /// Rebuild a dataset layout from chunk metadata alone.
    ///
    /// `blocks` is the number of row and column blocks; each chunk's shape is
    /// looked up by its key. Shapes must agree along rows and columns of the
    /// grid.
    pub fn from_metadata(
        name: impl Into<String>,
        kind: DataKind,
        blocks: (usize, usize),
        metadata: &dyn ChunkMetadata,
    ) -> Result<Self> {
        let name = name.into();
        let mut row_splits = vec![0; blocks.0];
        let mut col_splits = vec![0; blocks.1];

        for r in 0..blocks.0 {
            for c in 0..blocks.1 {
                let key = ChunkKey::new(&name, (r, c));
                let meta = metadata.chunk_meta(&key)?;
                if meta.kind != kind {
                    return Err(BaggingError::shape_mismatch(
                        format!("{} chunk", kind),
                        format!("{} chunk at {}", meta.kind, key),
                    ));
                }
                let (rows, cols) = meta.shape;
                if c == 0 {
                    row_splits[r] = rows;
                } else if row_splits[r] != rows {
                    return Err(BaggingError::shape_mismatch(
                        format!("{} rows in row block {}", row_splits[r], r),
                        format!("{} rows at {}", rows, key),
                    ));
                }
                if r == 0 {
                    col_splits[c] = cols;
                } else if col_splits[c] != cols {
                    return Err(BaggingError::shape_mismatch(
                        format!("{} columns in column block {}", col_splits[c], c),
                        format!("{} columns at {}", cols, key),
                    ));
                }
            }
        }

        Self::new(name, kind, row_splits, col_splits)
    }

    /// Dataset name
    pub fn name(&self) -> &str {
        self.grid.name()
    }

    /// Dataset kind
    pub fn kind(&self) -> DataKind {
        self.grid.kind()
    }

    /// Total rows
    pub fn n_rows(&self) -> usize {
        self.grid.n_rows()
    }

    /// Total columns
    pub fn n_cols(&self) -> usize {
        self.grid.n_cols()
    }

    /// Chunk grid of the dataset
    pub fn partition(&self) -> Grid {
        self.grid.clone()
    }
}

/// Chunk grid of `dataset`
pub fn partition(dataset: &LogicalDataset) -> Grid {
    dataset.partition()
}
