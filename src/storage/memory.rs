//! In-process chunk store.

use crate::core::error::{BaggingError, Result};
use crate::core::types::{DataKind, Value};
use crate::dataset::{ChunkData, ChunkKey, ChunkRef, LabeledTable, LogicalDataset, Tabular};
use crate::storage::{ChunkLocation, ChunkMeta, ChunkMetadata, ChunkStorage};

use ndarray::{Array1, Array2};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Chunk storage backed by a hash map, with per-key fetch accounting.
#[derive(Debug)]
pub struct InMemoryStorage {
    node: String,
    chunks: RwLock<HashMap<ChunkKey, Arc<ChunkData>>>,
    fetches: Mutex<HashMap<ChunkKey, usize>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> BaggingError {
    BaggingError::internal("in-memory storage lock poisoned")
}

impl InMemoryStorage {
    /// Create an empty store reporting `local` as the node of every chunk
    pub fn new() -> Self {
        Self::with_node("local")
    }

    /// Create an empty store reporting `node` as the node of every chunk
    pub fn with_node(node: impl Into<String>) -> Self {
        InMemoryStorage {
            node: node.into(),
            chunks: RwLock::new(HashMap::new()),
            fetches: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or replace a chunk
    pub fn put(&self, key: ChunkKey, data: ChunkData) -> Result<()> {
        self.chunks
            .write()
            .map_err(poisoned)?
            .insert(key, Arc::new(data));
        Ok(())
    }

    /// Remove a chunk, returning whether it was present
    pub fn remove(&self, key: &ChunkKey) -> Result<bool> {
        Ok(self.chunks.write().map_err(poisoned)?.remove(key).is_some())
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Whether no chunk is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How often the chunk with `key` was fetched
    pub fn fetch_count(&self, key: &ChunkKey) -> usize {
        self.fetches
            .lock()
            .map(|f| f.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total fetches across all chunks
    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().map(|f| f.values().sum()).unwrap_or(0)
    }

    /// Forget fetch statistics
    pub fn reset_fetch_counts(&self) {
        if let Ok(mut fetches) = self.fetches.lock() {
            fetches.clear();
        }
    }

    /// Split a matrix into chunks of at most `chunk_shape` and store them
    pub fn store_matrix(
        &self,
        name: &str,
        values: &Array2<Value>,
        chunk_shape: (usize, usize),
    ) -> Result<LogicalDataset> {
        let dataset = LogicalDataset::with_chunk_shape(
            name,
            DataKind::Matrix,
            values.dim(),
            chunk_shape,
        )?;
        self.store_chunks(&dataset, values, ChunkData::Matrix)?;
        Ok(dataset)
    }

    /// Split a labeled table into chunks of at most `chunk_shape` and store them
    pub fn store_table(
        &self,
        name: &str,
        table: &LabeledTable,
        chunk_shape: (usize, usize),
    ) -> Result<LogicalDataset> {
        let dataset = LogicalDataset::with_chunk_shape(
            name,
            DataKind::Table,
            table.shape(),
            chunk_shape,
        )?;
        self.store_chunks(&dataset, table, ChunkData::Table)?;
        Ok(dataset)
    }

    /// Split a vector into chunks of at most `chunk_rows` and store them
    pub fn store_vector(
        &self,
        name: &str,
        values: &Array1<Value>,
        chunk_rows: usize,
    ) -> Result<LogicalDataset> {
        let dataset = LogicalDataset::with_chunk_shape(
            name,
            DataKind::Vector,
            (values.len(), 1),
            (chunk_rows, 1),
        )?;
        self.store_chunks(&dataset, values, ChunkData::Vector)?;
        Ok(dataset)
    }

    fn store_chunks<T: Tabular>(
        &self,
        dataset: &LogicalDataset,
        source: &T,
        wrap: fn(T) -> ChunkData,
    ) -> Result<()> {
        let grid = dataset.partition();
        for chunk in grid.chunks() {
            let rows: Vec<usize> = chunk.rows.clone().collect();
            let mut block = source.take_rows(&rows)?;
            if let Some(cols) = &chunk.cols {
                let cols: Vec<usize> = cols.clone().collect();
                block = block.take_cols(&cols)?;
            }
            self.put(chunk.key.clone(), wrap(block))?;
        }
        log::debug!(
            "stored {} chunks of {} ({} x {})",
            grid.chunks().len(),
            grid.name(),
            grid.n_rows(),
            grid.n_cols()
        );
        Ok(())
    }
}

impl ChunkStorage for InMemoryStorage {
    fn locate(&self, key: &ChunkKey) -> Result<ChunkLocation> {
        if !self.chunks.read().map_err(poisoned)?.contains_key(key) {
            return Err(BaggingError::storage_fetch(key, "chunk not found"));
        }
        Ok(ChunkLocation {
            key: key.clone(),
            node: self.node.clone(),
        })
    }

    fn fetch(&self, chunk: &ChunkRef) -> Result<ChunkData> {
        let data = self
            .chunks
            .read()
            .map_err(poisoned)?
            .get(&chunk.key)
            .cloned()
            .ok_or_else(|| BaggingError::storage_fetch(&chunk.key, "chunk not found"))?;

        *self
            .fetches
            .lock()
            .map_err(poisoned)?
            .entry(chunk.key.clone())
            .or_insert(0) += 1;

        if data.shape() != chunk.shape() {
            return Err(BaggingError::shape_mismatch(
                format!("{:?} for {}", chunk.shape(), chunk.key),
                format!("{:?}", data.shape()),
            ));
        }
        log::trace!("fetched chunk {}", chunk.key);
        Ok(data.as_ref().clone())
    }
}

impl ChunkMetadata for InMemoryStorage {
    fn chunk_meta(&self, key: &ChunkKey) -> Result<ChunkMeta> {
        let chunks = self.chunks.read().map_err(poisoned)?;
        let data = chunks
            .get(key)
            .ok_or_else(|| BaggingError::storage_fetch(key, "chunk not found"))?;
        Ok(ChunkMeta {
            key: key.clone(),
            kind: data.kind(),
            shape: data.shape(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_store_and_fetch_matrix() {
        let storage = InMemoryStorage::new();
        let values = Array::from_shape_fn((45, 10), |(r, c)| (r * 10 + c) as Value);
        let dataset = storage.store_matrix("x", &values, (20, 4)).unwrap();
        assert_eq!(storage.len(), 9);

        let grid = dataset.partition();
        let chunk = grid.chunk_at(2, 2).unwrap();
        let data = storage.fetch(chunk).unwrap();
        assert_eq!(data.shape(), (5, 2));
        assert_eq!(data.as_matrix().unwrap()[[0, 0]], values[[40, 8]]);
        assert_eq!(storage.fetch_count(&chunk.key), 1);
        assert_eq!(storage.total_fetches(), 1);
    }

    #[test]
    fn test_missing_chunk() {
        let storage = InMemoryStorage::new();
        let values = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let dataset = storage.store_vector("y", &values, 2).unwrap();
        let grid = dataset.partition();
        let chunk = grid.chunk_at(1, 0).unwrap();

        assert!(storage.remove(&chunk.key).unwrap());
        let err = storage.fetch(chunk).unwrap_err();
        assert!(matches!(err, BaggingError::StorageFetch { .. }));
        assert!(err.is_recoverable());
        assert!(storage.locate(&chunk.key).is_err());
    }

    #[test]
    fn test_metadata_round_trip() {
        let storage = InMemoryStorage::with_node("worker-0");
        let table = LabeledTable::from_values(Array::zeros((30, 6)), 100);
        storage.store_table("t", &table, (20, 3)).unwrap();

        let rebuilt = LogicalDataset::from_metadata("t", DataKind::Table, (2, 2), &storage).unwrap();
        assert_eq!(rebuilt.partition().row_sizes(), vec![20, 10]);
        assert_eq!(
            storage.locate(&ChunkKey::new("t", (0, 1))).unwrap().node,
            "worker-0"
        );
    }

    #[test]
    fn test_fetch_rejects_mismatched_bounds() {
        let storage = InMemoryStorage::new();
        let dataset = storage
            .store_matrix("x", &Array::zeros((10, 2)), (5, 2))
            .unwrap();
        let grid = dataset.partition();
        let mut chunk = grid.chunk_at(0, 0).unwrap().clone();
        chunk.rows = 0..6;
        assert!(matches!(
            storage.fetch(&chunk),
            Err(BaggingError::ShapeMismatch { .. })
        ));
    }
}
