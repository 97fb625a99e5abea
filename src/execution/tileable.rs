//! Lazy, chunked results.

use crate::core::error::{BaggingError, Result};
use crate::core::types::GridIndex;
use crate::execution::{TaskExecutor, TaskHandle};

use std::fmt;
use std::sync::Arc;

/// Computation producing one output chunk.
pub type ChunkTask<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// A lazily computed, chunked result.
///
/// Every chunk is an independent task addressed by its grid index. Nothing is
/// computed until the tileable is handed to an executor, and the same
/// tileable can be executed any number of times.
pub struct Tileable<T> {
    name: String,
    grid_shape: (usize, usize),
    chunks: Vec<(GridIndex, ChunkTask<T>)>,
}

impl<T> fmt::Debug for Tileable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tileable")
            .field("name", &self.name)
            .field("grid_shape", &self.grid_shape)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl<T> Clone for Tileable<T> {
    fn clone(&self) -> Self {
        Tileable {
            name: self.name.clone(),
            grid_shape: self.grid_shape,
            chunks: self.chunks.clone(),
        }
    }
}

impl<T: Send + 'static> Tileable<T> {
    /// Create a tileable from its chunk tasks, listed in output order
    pub fn new(
        name: impl Into<String>,
        grid_shape: (usize, usize),
        chunks: Vec<(GridIndex, ChunkTask<T>)>,
    ) -> Self {
        Tileable {
            name: name.into(),
            grid_shape,
            chunks,
        }
    }

    /// Name of the output
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(row_blocks, col_blocks)` of the output grid
    pub fn grid_shape(&self) -> (usize, usize) {
        self.grid_shape
    }

    /// Number of output chunks
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Grid indices of the output chunks, in output order
    pub fn indices(&self) -> Vec<GridIndex> {
        self.chunks.iter().map(|(index, _)| *index).collect()
    }

    /// Compute one chunk on the calling thread
    pub fn execute_chunk(&self, index: GridIndex) -> Result<T> {
        let (_, task) = self
            .chunks
            .iter()
            .find(|(i, _)| *i == index)
            .ok_or_else(|| {
                BaggingError::index_out_of_range(
                    index.0 * self.grid_shape.1 + index.1,
                    self.chunks.len(),
                    format!("chunks of {}", self.name),
                )
            })?;
        task()
    }

    /// Submit every chunk to `executor`
    pub fn submit<E: TaskExecutor>(&self, executor: &E) -> Vec<(GridIndex, TaskHandle<T>)> {
        self.chunks
            .iter()
            .map(|(index, task)| {
                let task = Arc::clone(task);
                (*index, executor.submit(move || task()))
            })
            .collect()
    }

    /// Compute every chunk, reporting each chunk's outcome separately
    pub fn execute<E: TaskExecutor>(&self, executor: &E) -> Vec<(GridIndex, Result<T>)> {
        log::debug!(
            "executing {} chunks of {} on {} threads",
            self.chunks.len(),
            self.name,
            executor.parallelism()
        );
        self.submit(executor)
            .into_iter()
            .map(|(index, handle)| (index, handle.wait()))
            .collect()
    }

    /// Compute every chunk, failing on the first chunk error
    pub fn execute_all<E: TaskExecutor>(&self, executor: &E) -> Result<Vec<(GridIndex, T)>> {
        self.execute(executor)
            .into_iter()
            .map(|(index, result)| result.map(|value| (index, value)))
            .collect()
    }

    /// Compute every chunk and drop the indices
    pub fn collect<E: TaskExecutor>(&self, executor: &E) -> Result<Vec<T>> {
        Ok(self
            .execute_all(executor)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }
}
