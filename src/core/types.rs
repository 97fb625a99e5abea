//! Core data types shared by the planner, the gather engine and the reindexer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Row (instance) index into a logical dataset.
pub type RowIndex = usize;

/// Column (feature) index into a logical dataset.
pub type FeatureIndex = usize;

/// Identifier of one member of the bagging ensemble.
pub type EstimatorId = usize;

/// Two-dimensional grid coordinate `(row_block, col_block)`.
pub type GridIndex = (usize, usize);

/// Element type of numeric chunk data.
pub type Value = f64;

/// A sampling quantity given either as an absolute count or as a fraction.
///
/// How the quantity resolves against a dataset dimension depends on whether it
/// sizes the row sample or the feature subset, see
/// [`SampleSize::resolve_rows`] and [`SampleSize::resolve_features`].
///
/// Serialized untagged: integers read as counts, floats as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleSize {
    /// Absolute number of items
    Count(usize),
    /// Fraction of the available items
    Fraction(f64),
}

impl SampleSize {
    /// Check that the quantity is strictly positive and finite.
    pub fn is_positive(&self) -> bool {
        match *self {
            SampleSize::Count(n) => n > 0,
            SampleSize::Fraction(f) => f.is_finite() && f > 0.0,
        }
    }

    /// Number of rows drawn per estimator out of `n_rows`.
    ///
    /// Counts are taken as-is. A fraction above one is read as a count and
    /// rounded; fractions up to and including one scale `n_rows`, so `1.0`
    /// draws as many rows as the dataset has. Rounding is half away from zero
    /// and the result is never below one.
    pub fn resolve_rows(&self, n_rows: usize) -> usize {
        match *self {
            SampleSize::Count(n) => n.max(1),
            SampleSize::Fraction(f) if f > 1.0 => round_at_least_one(f),
            SampleSize::Fraction(f) => round_at_least_one(f * n_rows as f64),
        }
    }

    /// Number of features selected per estimator out of `n_cols`, or `None`
    /// when every column is kept and no feature plan should exist.
    pub fn resolve_features(&self, n_cols: usize) -> Option<usize> {
        match *self {
            SampleSize::Count(n) if n >= n_cols => None,
            SampleSize::Count(n) => Some(n.max(1)),
            SampleSize::Fraction(f) if f >= 1.0 => None,
            SampleSize::Fraction(f) => {
                let count = round_at_least_one(f * n_cols as f64);
                if count >= n_cols {
                    None
                } else {
                    Some(count)
                }
            }
        }
    }
}

fn round_at_least_one(x: f64) -> usize {
    (x.round() as usize).max(1)
}

impl From<usize> for SampleSize {
    fn from(count: usize) -> Self {
        SampleSize::Count(count)
    }
}

impl From<f64> for SampleSize {
    fn from(fraction: f64) -> Self {
        SampleSize::Fraction(fraction)
    }
}

impl fmt::Display for SampleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleSize::Count(n) => write!(f, "{}", n),
            SampleSize::Fraction(x) => write!(f, "{}", x),
        }
    }
}

/// Physical kind of a logical dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Homogeneous numeric matrix
    Matrix,
    /// Table with named columns and integer row labels
    Table,
    /// One-dimensional vector (labels, weights)
    Vector,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Matrix => write!(f, "matrix"),
            DataKind::Table => write!(f, "table"),
            DataKind::Vector => write!(f, "vector"),
        }
    }
}
