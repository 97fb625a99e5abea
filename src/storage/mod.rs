//! Chunk storage and metadata collaborators.
//!
//! Sampling and reindexing never hold whole datasets. They resolve chunk keys
//! through a [`ChunkStorage`] and fetch only the chunks a task needs.
//! [`InMemoryStorage`] implements both traits for tests, benchmarks and
//! single-process use.

pub mod memory;

pub use memory::InMemoryStorage;

use crate::core::error::Result;
use crate::core::types::DataKind;
use crate::dataset::{ChunkData, ChunkKey, ChunkRef};

use serde::{Deserialize, Serialize};

/// Physical location of a stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLocation {
    /// Chunk key
    pub key: ChunkKey,
    /// Node holding the chunk
    pub node: String,
}

/// Shape metadata of a stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Chunk key
    pub key: ChunkKey,
    /// Kind of the stored block
    pub kind: DataKind,
    /// `(rows, cols)`, vectors report one column
    pub shape: (usize, usize),
}

/// Resolves chunk keys to locations and fetches chunk content.
pub trait ChunkStorage: Send + Sync {
    /// Where the chunk with `key` lives
    fn locate(&self, key: &ChunkKey) -> Result<ChunkLocation>;

    /// Materialize the chunk referenced by `chunk`.
    ///
    /// Implementations return [`BaggingError::StorageFetch`] when the chunk
    /// is unavailable.
    ///
    /// [`BaggingError::StorageFetch`]: crate::core::error::BaggingError::StorageFetch
    fn fetch(&self, chunk: &ChunkRef) -> Result<ChunkData>;
}

/// Looks up chunk shapes without materializing chunks.
pub trait ChunkMetadata: Send + Sync {
    /// Metadata of the chunk with `key`
    fn chunk_meta(&self, key: &ChunkKey) -> Result<ChunkMeta>;
}
