//! Common test utilities for chunked bagging integration tests.

#![allow(dead_code)]

use chunked_bagging::*;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use std::sync::Arc;

/// Random matrix with values in `[-5, 5)`
pub fn create_test_matrix(num_rows: usize, num_cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut values = Array2::zeros((num_rows, num_cols));

    for i in 0..num_rows {
        for j in 0..num_cols {
            values[[i, j]] = rng.gen_range(-5.0..5.0);
        }
    }

    values
}

/// Matrix whose entry `(r, c)` encodes its own position as `r * 1000 + c`
pub fn create_position_matrix(num_rows: usize, num_cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((num_rows, num_cols), |(r, c)| (r * 1000 + c) as f64)
}

/// Binary labels with a fixed seed
pub fn create_test_labels(num_rows: usize) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(123);
    Array1::from_shape_fn(num_rows, |_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 })
}

/// Positive sample weights with a fixed seed
pub fn create_test_weights(num_rows: usize) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(456);
    Array1::from_shape_fn(num_rows, |_| rng.gen_range(0.1..1.0))
}

/// Empty in-memory storage
pub fn storage() -> Arc<InMemoryStorage> {
    Arc::new(InMemoryStorage::new())
}

/// Configuration with a fixed seed
pub fn create_test_config(
    n_estimators: usize,
    max_samples: impl Into<SampleSize>,
    max_features: impl Into<SampleSize>,
) -> BaggingConfig {
    BaggingConfigBuilder::new()
        .n_estimators(n_estimators)
        .max_samples(max_samples)
        .max_features(max_features)
        .random_seed(0)
        .build()
        .unwrap()
}

/// Row `r` of `values` restricted to `cols`
pub fn expected_row(values: &Array2<f64>, r: usize, cols: Option<&[usize]>) -> Vec<f64> {
    match cols {
        Some(cols) => cols.iter().map(|&c| values[[r, c]]).collect(),
        None => values.row(r).to_vec(),
    }
}
