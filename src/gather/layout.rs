//! Which blocks a task needs and where global indices land once they are
//! stitched together.

use crate::core::error::{BaggingError, Result};
use crate::core::types::{FeatureIndex, RowIndex};
use crate::dataset::{ChunkRef, Grid, Tabular};

use std::collections::BTreeSet;

/// Row blocks needed by a set of row samples, and each sampled row's
/// position in the row-wise concatenation of those blocks.
#[derive(Debug, Clone)]
pub(crate) struct RowLayout {
    blocks: Vec<usize>,
    positions: Vec<Vec<usize>>,
}

impl RowLayout {
    /// Locate every row of every sample, one binary search per row
    pub(crate) fn new<'s, I>(grid: &Grid, samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'s [RowIndex]>,
    {
        let mut needed = vec![false; grid.row_chunk_count()];
        let mut located: Vec<Vec<(usize, usize)>> = Vec::new();
        for rows in samples {
            let mut sample = Vec::with_capacity(rows.len());
            for &row in rows {
                let block = grid.row_block_of(row)?;
                let start = grid.row_range(block)?.start;
                needed[block] = true;
                sample.push((block, row - start));
            }
            located.push(sample);
        }

        let mut offsets = vec![0; needed.len()];
        let mut blocks = Vec::new();
        let mut next = 0;
        for (block, &is_needed) in needed.iter().enumerate() {
            if is_needed {
                offsets[block] = next;
                next += grid.row_range(block)?.len();
                blocks.push(block);
            }
        }

        let positions = located
            .into_iter()
            .map(|sample| {
                sample
                    .into_iter()
                    .map(|(block, local)| offsets[block] + local)
                    .collect()
            })
            .collect();

        Ok(RowLayout { blocks, positions })
    }

    /// Needed row blocks, ascending
    pub(crate) fn blocks(&self) -> &[usize] {
        &self.blocks
    }

    /// Stitched positions of the `i`-th sample's rows, in sample order
    pub(crate) fn positions(&self, i: usize) -> &[usize] {
        &self.positions[i]
    }
}

/// Column blocks needed for a set of features and each needed column's
/// position in the column-wise concatenation of those blocks.
#[derive(Debug, Clone)]
pub(crate) struct ColumnLayout<'g> {
    grid: &'g Grid,
    blocks: Vec<usize>,
    offsets: Vec<Option<usize>>,
}

impl<'g> ColumnLayout<'g> {
    /// Every column block of `grid`
    pub(crate) fn all(grid: &'g Grid) -> Self {
        let blocks: Vec<usize> = (0..grid.col_chunk_count()).collect();
        Self::from_blocks(grid, blocks)
    }

    /// Only the column blocks holding one of `features`
    pub(crate) fn covering<I>(grid: &'g Grid, features: I) -> Result<Self>
    where
        I: IntoIterator<Item = FeatureIndex>,
    {
        let blocks = features
            .into_iter()
            .map(|f| grid.col_block_of(f))
            .collect::<Result<BTreeSet<usize>>>()?;
        Ok(Self::from_blocks(grid, blocks.into_iter().collect()))
    }

    fn from_blocks(grid: &'g Grid, blocks: Vec<usize>) -> Self {
        let sizes = grid.col_sizes();
        let mut offsets = vec![None; sizes.len()];
        let mut next = 0;
        for &block in &blocks {
            offsets[block] = Some(next);
            next += sizes[block];
        }
        ColumnLayout {
            grid,
            blocks,
            offsets,
        }
    }

    /// Needed column blocks, ascending
    pub(crate) fn blocks(&self) -> &[usize] {
        &self.blocks
    }

    /// Position of global column `col` in the stitched block
    pub(crate) fn position(&self, col: FeatureIndex) -> Result<usize> {
        let block = self.grid.col_block_of(col)?;
        let start = self.grid.col_range(block)?.start;
        self.offsets[block]
            .map(|offset| offset + col - start)
            .ok_or_else(|| {
                BaggingError::internal(format!(
                    "column {} lies in column block {} which was not fetched",
                    col, block
                ))
            })
    }

    /// Positions of `cols` in the stitched block, in the given order
    pub(crate) fn positions(&self, cols: &[FeatureIndex]) -> Result<Vec<usize>> {
        cols.iter().map(|&c| self.position(c)).collect()
    }

    /// Fetch the needed column blocks of row block `r` and stitch them side
    /// by side. Each chunk is fetched once.
    pub(crate) fn fetch_row_block<T, F>(&self, r: usize, fetch: &F) -> Result<T>
    where
        T: Tabular,
        F: Fn(&ChunkRef) -> Result<T>,
    {
        let parts = self
            .blocks
            .iter()
            .map(|&c| fetch(self.grid.chunk_at(r, c)?))
            .collect::<Result<Vec<T>>>()?;
        T::concat_cols(&parts)
    }
}
