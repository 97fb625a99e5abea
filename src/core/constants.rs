//! Default configuration values used throughout the crate.

use crate::core::types::SampleSize;

/// Default number of estimators in the ensemble.
pub const DEFAULT_N_ESTIMATORS: usize = 10;

/// Default per-estimator row sample: as many rows as the dataset has.
pub const DEFAULT_MAX_SAMPLES: SampleSize = SampleSize::Fraction(1.0);

/// Default per-estimator feature subset: all columns (no feature plan).
pub const DEFAULT_MAX_FEATURES: SampleSize = SampleSize::Fraction(1.0);

/// Rows are drawn with replacement unless configured otherwise.
pub const DEFAULT_BOOTSTRAP: bool = true;

/// Default number of threads for the rayon executor.
/// 0 means use all available cores.
pub const DEFAULT_NUM_THREADS: usize = 0;

/// Prefix of environment variables read by the configuration loader.
pub const ENV_PREFIX: &str = "BAGGING_";

/// Upper bound on the row indices a plan may hold across all estimators.
pub const MAX_SAMPLED_ROWS: usize = u32::MAX as usize;

/// Crate version string.
pub const CHUNKED_BAGGING_VERSION: &str = env!("CARGO_PKG_VERSION");
