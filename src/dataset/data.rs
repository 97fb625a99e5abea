//! Materialized chunk data and the slicing capability the gather and reindex
//! algorithms are written against.
//!
//! [`Tabular`] is implemented by the numeric matrix (`Array2`), by
//! [`LabeledTable`], by label/weight vectors (`Array1`) and by the dynamic
//! [`ChunkData`] enum that storage hands back.

use crate::core::error::{BaggingError, Result};
use crate::core::types::{DataKind, Value};

use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Row/column slicing over a materialized two-dimensional block.
///
/// `take_*` copy the selected rows or columns in the order given, so repeated
/// indices yield repeated, independently owned rows. Indices are bounds
/// checked and an out-of-range index is reported as
/// [`BaggingError::IndexOutOfRange`].
pub trait Tabular: Sized {
    /// Number of rows
    fn n_rows(&self) -> usize;

    /// Number of columns
    fn n_cols(&self) -> usize;

    /// Copy the given rows, in order
    fn take_rows(&self, rows: &[usize]) -> Result<Self>;

    /// Copy the given columns, in order
    fn take_cols(&self, cols: &[usize]) -> Result<Self>;

    /// Stack blocks vertically
    fn concat_rows(parts: &[Self]) -> Result<Self>;

    /// Place blocks side by side
    fn concat_cols(parts: &[Self]) -> Result<Self>;

    /// `(n_rows, n_cols)`
    fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_cols())
    }
}

fn check_indices(indices: &[usize], bound: usize, context: &str) -> Result<()> {
    match indices.iter().find(|&&i| i >= bound) {
        Some(&index) => Err(BaggingError::index_out_of_range(index, bound, context)),
        None => Ok(()),
    }
}

fn first_part<T>(parts: &[T]) -> Result<&T> {
    parts
        .first()
        .ok_or_else(|| BaggingError::internal("cannot concatenate an empty list of chunks"))
}

impl Tabular for Array2<Value> {
    fn n_rows(&self) -> usize {
        self.nrows()
    }

    fn n_cols(&self) -> usize {
        self.ncols()
    }

    fn take_rows(&self, rows: &[usize]) -> Result<Self> {
        check_indices(rows, self.nrows(), "matrix rows")?;
        Ok(self.select(Axis(0), rows))
    }

    fn take_cols(&self, cols: &[usize]) -> Result<Self> {
        check_indices(cols, self.ncols(), "matrix columns")?;
        Ok(self.select(Axis(1), cols))
    }

    fn concat_rows(parts: &[Self]) -> Result<Self> {
        first_part(parts)?;
        let views: Vec<ArrayView2<'_, Value>> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(0), &views)?)
    }

    fn concat_cols(parts: &[Self]) -> Result<Self> {
        first_part(parts)?;
        let views: Vec<ArrayView2<'_, Value>> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(1), &views)?)
    }
}

impl Tabular for Array1<Value> {
    fn n_rows(&self) -> usize {
        self.len()
    }

    fn n_cols(&self) -> usize {
        1
    }

    fn take_rows(&self, rows: &[usize]) -> Result<Self> {
        check_indices(rows, self.len(), "vector rows")?;
        Ok(self.select(Axis(0), rows))
    }

    fn take_cols(&self, cols: &[usize]) -> Result<Self> {
        if cols == [0] {
            return Ok(self.clone());
        }
        Err(BaggingError::shape_mismatch(
            "column selection [0] on a vector",
            format!("column selection {:?}", cols),
        ))
    }

    fn concat_rows(parts: &[Self]) -> Result<Self> {
        first_part(parts)?;
        let views: Vec<ArrayView1<'_, Value>> = parts.iter().map(|p| p.view()).collect();
        Ok(concatenate(Axis(0), &views)?)
    }

    fn concat_cols(parts: &[Self]) -> Result<Self> {
        match parts {
            [single] => Ok(single.clone()),
            _ => Err(BaggingError::shape_mismatch(
                "a single column block for a vector",
                format!("{} column blocks", parts.len()),
            )),
        }
    }
}

/// A table with named columns and an integer label per row.
///
/// Row labels travel with their rows through every slicing operation, so a
/// gathered slice can be traced back to the source rows it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledTable {
    columns: Vec<String>,
    row_labels: Vec<i64>,
    values: Array2<Value>,
}

impl LabeledTable {
    /// Create a table, checking that names and labels match the value shape
    pub fn new(columns: Vec<String>, row_labels: Vec<i64>, values: Array2<Value>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(BaggingError::shape_mismatch(
                format!("{} column names", values.ncols()),
                format!("{} column names", columns.len()),
            ));
        }
        if row_labels.len() != values.nrows() {
            return Err(BaggingError::shape_mismatch(
                format!("{} row labels", values.nrows()),
                format!("{} row labels", row_labels.len()),
            ));
        }
        Ok(LabeledTable {
            columns,
            row_labels,
            values,
        })
    }

    /// Create a table with columns named `"0"`, `"1"`, ... and row labels
    /// `0..n_rows` offset by `first_label`
    pub fn from_values(values: Array2<Value>, first_label: i64) -> Self {
        let columns = (0..values.ncols()).map(|c| c.to_string()).collect();
        let row_labels = (0..values.nrows() as i64).map(|r| first_label + r).collect();
        LabeledTable {
            columns,
            row_labels,
            values,
        }
    }

    /// Column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row labels
    pub fn row_labels(&self) -> &[i64] {
        &self.row_labels
    }

    /// Numeric values
    pub fn values(&self) -> &Array2<Value> {
        &self.values
    }
}

impl Tabular for LabeledTable {
    fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    fn take_rows(&self, rows: &[usize]) -> Result<Self> {
        let values = self.values.take_rows(rows)?;
        let row_labels = rows.iter().map(|&r| self.row_labels[r]).collect();
        Ok(LabeledTable {
            columns: self.columns.clone(),
            row_labels,
            values,
        })
    }

    fn take_cols(&self, cols: &[usize]) -> Result<Self> {
        let values = self.values.take_cols(cols)?;
        let columns = cols.iter().map(|&c| self.columns[c].clone()).collect();
        Ok(LabeledTable {
            columns,
            row_labels: self.row_labels.clone(),
            values,
        })
    }

    fn concat_rows(parts: &[Self]) -> Result<Self> {
        let first = first_part(parts)?;
        if let Some(other) = parts.iter().find(|p| p.columns != first.columns) {
            return Err(BaggingError::shape_mismatch(
                format!("columns {:?}", first.columns),
                format!("columns {:?}", other.columns),
            ));
        }
        let views: Vec<ArrayView2<'_, Value>> = parts.iter().map(|p| p.values.view()).collect();
        Ok(LabeledTable {
            columns: first.columns.clone(),
            row_labels: parts.iter().flat_map(|p| p.row_labels.iter().copied()).collect(),
            values: concatenate(Axis(0), &views)?,
        })
    }

    fn concat_cols(parts: &[Self]) -> Result<Self> {
        let first = first_part(parts)?;
        if let Some(other) = parts.iter().find(|p| p.row_labels != first.row_labels) {
            return Err(BaggingError::shape_mismatch(
                format!("{} aligned row labels", first.row_labels.len()),
                format!("{} unaligned row labels", other.row_labels.len()),
            ));
        }
        let views: Vec<ArrayView2<'_, Value>> = parts.iter().map(|p| p.values.view()).collect();
        Ok(LabeledTable {
            columns: parts.iter().flat_map(|p| p.columns.iter().cloned()).collect(),
            row_labels: first.row_labels.clone(),
            values: concatenate(Axis(1), &views)?,
        })
    }
}

/// Materialized content of one chunk as returned by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChunkData {
    /// Numeric matrix block
    Matrix(Array2<Value>),
    /// Labeled table block
    Table(LabeledTable),
    /// Vector block (labels or weights)
    Vector(Array1<Value>),
}

impl ChunkData {
    /// Kind of the contained block
    pub fn kind(&self) -> DataKind {
        match self {
            ChunkData::Matrix(_) => DataKind::Matrix,
            ChunkData::Table(_) => DataKind::Table,
            ChunkData::Vector(_) => DataKind::Vector,
        }
    }

    /// Borrow the matrix block, if this is one
    pub fn as_matrix(&self) -> Option<&Array2<Value>> {
        match self {
            ChunkData::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow the table block, if this is one
    pub fn as_table(&self) -> Option<&LabeledTable> {
        match self {
            ChunkData::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Borrow the vector block, if this is one
    pub fn as_vector(&self) -> Option<&Array1<Value>> {
        match self {
            ChunkData::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Unwrap a vector block
    pub fn into_vector(self) -> Result<Array1<Value>> {
        match self {
            ChunkData::Vector(v) => Ok(v),
            other => Err(BaggingError::shape_mismatch(
                "vector chunk",
                format!("{} chunk", other.kind()),
            )),
        }
    }
}

macro_rules! concat_same_kind {
    ($parts:expr, $method:ident) => {{
        let first = first_part($parts)?;
        match first {
            ChunkData::Matrix(_) => {
                let blocks = collect_variant($parts, ChunkData::as_matrix)?;
                ChunkData::Matrix(Array2::$method(&blocks)?)
            }
            ChunkData::Table(_) => {
                let blocks = collect_variant($parts, ChunkData::as_table)?;
                ChunkData::Table(LabeledTable::$method(&blocks)?)
            }
            ChunkData::Vector(_) => {
                let blocks = collect_variant($parts, ChunkData::as_vector)?;
                ChunkData::Vector(Array1::$method(&blocks)?)
            }
        }
    }};
}

fn collect_variant<T: Clone>(
    parts: &[ChunkData],
    project: fn(&ChunkData) -> Option<&T>,
) -> Result<Vec<T>> {
    let kind = first_part(parts)?.kind();
    parts
        .iter()
        .map(|p| {
            project(p).cloned().ok_or_else(|| {
                BaggingError::shape_mismatch(format!("{} chunk", kind), format!("{} chunk", p.kind()))
            })
        })
        .collect()
}

impl Tabular for ChunkData {
    fn n_rows(&self) -> usize {
        match self {
            ChunkData::Matrix(m) => m.n_rows(),
            ChunkData::Table(t) => t.n_rows(),
            ChunkData::Vector(v) => v.n_rows(),
        }
    }

    fn n_cols(&self) -> usize {
        match self {
            ChunkData::Matrix(m) => m.n_cols(),
            ChunkData::Table(t) => t.n_cols(),
            ChunkData::Vector(v) => v.n_cols(),
        }
    }

    fn take_rows(&self, rows: &[usize]) -> Result<Self> {
        Ok(match self {
            ChunkData::Matrix(m) => ChunkData::Matrix(m.take_rows(rows)?),
            ChunkData::Table(t) => ChunkData::Table(t.take_rows(rows)?),
            ChunkData::Vector(v) => ChunkData::Vector(v.take_rows(rows)?),
        })
    }

    fn take_cols(&self, cols: &[usize]) -> Result<Self> {
        Ok(match self {
            ChunkData::Matrix(m) => ChunkData::Matrix(m.take_cols(cols)?),
            ChunkData::Table(t) => ChunkData::Table(t.take_cols(cols)?),
            ChunkData::Vector(v) => ChunkData::Vector(v.take_cols(cols)?),
        })
    }

    fn concat_rows(parts: &[Self]) -> Result<Self> {
        if let [single] = parts {
            return Ok(single.clone());
        }
        Ok(concat_same_kind!(parts, concat_rows))
    }

    fn concat_cols(parts: &[Self]) -> Result<Self> {
        if let [single] = parts {
            return Ok(single.clone());
        }
        Ok(concat_same_kind!(parts, concat_cols))
    }
}
