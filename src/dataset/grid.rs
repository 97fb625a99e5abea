//! Chunk grid of a logical dataset.
//!
//! A [`Grid`] records the row and column boundaries of every chunk of a
//! dataset. Chunks are addressed by `(row_block, col_block)`; the row blocks
//! cover `0..n_rows` contiguously without overlap and likewise for columns.
//! Vectors have a single column block and their chunks carry no column range.

use crate::core::error::{BaggingError, Result};
use crate::core::types::{DataKind, GridIndex, RowIndex};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Storage key of a single chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey(String);

impl ChunkKey {
    /// Key of chunk `index` of the dataset called `dataset`
    pub fn new(dataset: &str, index: GridIndex) -> Self {
        ChunkKey(format!("{}/{}-{}", dataset, index.0, index.1))
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ChunkKey> for String {
    fn from(key: &ChunkKey) -> Self {
        key.0.clone()
    }
}

/// Reference to one chunk and the global region it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    /// Storage key
    pub key: ChunkKey,
    /// Position in the grid
    pub index: GridIndex,
    /// Global rows covered
    pub rows: Range<RowIndex>,
    /// Global columns covered, `None` for vectors
    pub cols: Option<Range<usize>>,
}

impl ChunkRef {
    /// `(rows, cols)` of the chunk; vectors report one column
    pub fn shape(&self) -> (usize, usize) {
        let cols = self.cols.as_ref().map_or(1, |c| c.len());
        (self.rows.len(), cols)
    }
}

/// Chunk layout of a logical dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    name: String,
    kind: DataKind,
    row_offsets: Vec<usize>,
    col_offsets: Vec<usize>,
    chunks: Vec<ChunkRef>,
}

fn offsets(sizes: &[usize], axis: &str) -> Result<Vec<usize>> {
    if sizes.is_empty() {
        return Err(BaggingError::shape_mismatch(
            format!("at least one {} block", axis),
            "no blocks",
        ));
    }
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    offsets.push(0);
    for (i, &size) in sizes.iter().enumerate() {
        if size == 0 {
            return Err(BaggingError::shape_mismatch(
                format!("non-empty {} block", axis),
                format!("{} block {} of size 0", axis, i),
            ));
        }
        offsets.push(offsets[i] + size);
    }
    Ok(offsets)
}

/// Split `total` into blocks of `chunk` (the last one possibly shorter)
pub(crate) fn uniform_splits(total: usize, chunk: usize) -> Vec<usize> {
    let chunk = chunk.max(1);
    let mut sizes = vec![chunk; total / chunk];
    if total % chunk != 0 {
        sizes.push(total % chunk);
    }
    sizes
}

/// Index of the block in `offsets` that contains `position`
fn block_of(offsets: &[usize], position: usize) -> Option<usize> {
    let total = *offsets.last()?;
    if position >= total {
        return None;
    }
    Some(offsets.partition_point(|&start| start <= position) - 1)
}

impl Grid {
    /// Build a grid from explicit block sizes along each axis.
    ///
    /// Every block must be non-empty. Vectors must have exactly one column
    /// block of width one.
    pub fn from_splits(
        name: &str,
        kind: DataKind,
        row_sizes: &[usize],
        col_sizes: &[usize],
    ) -> Result<Self> {
        if kind == DataKind::Vector && col_sizes != [1] {
            return Err(BaggingError::shape_mismatch(
                "a single column of width 1 for a vector",
                format!("column blocks {:?}", col_sizes),
            ));
        }

        let row_offsets = offsets(row_sizes, "row")?;
        let col_offsets = offsets(col_sizes, "column")?;

        let mut chunks = Vec::with_capacity(row_sizes.len() * col_sizes.len());
        for r in 0..row_sizes.len() {
            for c in 0..col_sizes.len() {
                let cols = match kind {
                    DataKind::Vector => None,
                    _ => Some(col_offsets[c]..col_offsets[c + 1]),
                };
                chunks.push(ChunkRef {
                    key: ChunkKey::new(name, (r, c)),
                    index: (r, c),
                    rows: row_offsets[r]..row_offsets[r + 1],
                    cols,
                });
            }
        }

        Ok(Grid {
            name: name.to_string(),
            kind,
            row_offsets,
            col_offsets,
            chunks,
        })
    }

    /// Build a grid with blocks of at most `chunk_shape` along each axis
    pub fn uniform(
        name: &str,
        kind: DataKind,
        shape: (usize, usize),
        chunk_shape: (usize, usize),
    ) -> Result<Self> {
        let col_sizes = match kind {
            DataKind::Vector => vec![1],
            _ => uniform_splits(shape.1, chunk_shape.1),
        };
        Self::from_splits(name, kind, &uniform_splits(shape.0, chunk_shape.0), &col_sizes)
    }

    /// Dataset name the chunk keys derive from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the dataset
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// Total rows
    pub fn n_rows(&self) -> usize {
        *self.row_offsets.last().unwrap_or(&0)
    }

    /// Total columns (one for vectors)
    pub fn n_cols(&self) -> usize {
        *self.col_offsets.last().unwrap_or(&0)
    }

    /// `(n_rows, n_cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }

    /// Number of row blocks
    pub fn row_chunk_count(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Number of column blocks
    pub fn col_chunk_count(&self) -> usize {
        self.col_offsets.len() - 1
    }

    /// All chunks in row-major order
    pub fn chunks(&self) -> &[ChunkRef] {
        &self.chunks
    }

    /// Chunk at grid position `(r, c)`
    pub fn chunk_at(&self, r: usize, c: usize) -> Result<&ChunkRef> {
        if r >= self.row_chunk_count() {
            return Err(BaggingError::index_out_of_range(
                r,
                self.row_chunk_count(),
                format!("row blocks of {}", self.name),
            ));
        }
        if c >= self.col_chunk_count() {
            return Err(BaggingError::index_out_of_range(
                c,
                self.col_chunk_count(),
                format!("column blocks of {}", self.name),
            ));
        }
        Ok(&self.chunks[r * self.col_chunk_count() + c])
    }

    /// The chunks of row block `r`, ordered by column block
    pub fn row_chunks(&self, r: usize) -> Result<&[ChunkRef]> {
        let width = self.col_chunk_count();
        self.chunk_at(r, 0)?;
        Ok(&self.chunks[r * width..(r + 1) * width])
    }

    /// Global rows covered by row block `r`
    pub fn row_range(&self, r: usize) -> Result<Range<usize>> {
        match (self.row_offsets.get(r), self.row_offsets.get(r + 1)) {
            (Some(&start), Some(&end)) => Ok(start..end),
            _ => Err(BaggingError::index_out_of_range(
                r,
                self.row_chunk_count(),
                format!("row blocks of {}", self.name),
            )),
        }
    }

    /// Global columns covered by column block `c`
    pub fn col_range(&self, c: usize) -> Result<Range<usize>> {
        match (self.col_offsets.get(c), self.col_offsets.get(c + 1)) {
            (Some(&start), Some(&end)) => Ok(start..end),
            _ => Err(BaggingError::index_out_of_range(
                c,
                self.col_chunk_count(),
                format!("column blocks of {}", self.name),
            )),
        }
    }

    /// Row block containing global row `row` (binary search)
    pub fn row_block_of(&self, row: RowIndex) -> Result<usize> {
        block_of(&self.row_offsets, row).ok_or_else(|| {
            BaggingError::index_out_of_range(row, self.n_rows(), format!("rows of {}", self.name))
        })
    }

    /// Column block containing global column `col` (binary search)
    pub fn col_block_of(&self, col: usize) -> Result<usize> {
        block_of(&self.col_offsets, col).ok_or_else(|| {
            BaggingError::index_out_of_range(col, self.n_cols(), format!("columns of {}", self.name))
        })
    }

    /// Row block sizes, in order
    pub fn row_sizes(&self) -> Vec<usize> {
        self.row_offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Column block sizes, in order
    pub fn col_sizes(&self) -> Vec<usize> {
        self.col_offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }
}
