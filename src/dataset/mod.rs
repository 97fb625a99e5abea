//! Partition model for chunked datasets.
//!
//! A [`LogicalDataset`] describes how a dataset is split into chunks without
//! holding any data. Its [`Grid`] maps every chunk to the global row and
//! column ranges it covers, and [`ChunkData`] is what storage returns when a
//! chunk is materialized.

pub mod data;
pub mod dataset;
pub mod grid;

pub use data::{ChunkData, LabeledTable, Tabular};
pub use dataset::{partition, LogicalDataset};
pub use grid::{ChunkKey, ChunkRef, Grid};
