//! Shape-aware validation of a [`BaggingConfig`].
//!
//! [`BaggingConfig::validate`] only checks parameters in isolation. The
//! validator here also knows the shape and chunk layout of the dataset a plan
//! is about to be built for, so it can reject sample sizes that cannot be
//! drawn and warn about configurations that are valid but probably unintended.

use crate::config::core::BaggingConfig;
use crate::core::constants::MAX_SAMPLED_ROWS;
use crate::core::error::{BaggingError, Result};

use serde::{Deserialize, Serialize};

/// Validation result enumeration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationResult {
    /// Parameter is valid
    Valid,
    /// Parameter has a warning (non-fatal)
    Warning(ValidationWarning),
    /// Parameter has an error (fatal)
    Error(ValidationError),
}

/// Validation warning structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Parameter name
    pub parameter: String,
    /// Parameter value
    pub value: String,
    /// Warning message
    pub message: String,
}

/// Validation error structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Parameter name
    pub parameter: String,
    /// Parameter value
    pub value: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parameter '{}' = '{}': {}",
            self.parameter, self.value, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for BaggingError {
    fn from(err: ValidationError) -> Self {
        BaggingError::configuration(err.parameter, err.value, err.message)
    }
}

/// Shape and chunk layout of the dataset a configuration is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeContext {
    /// Number of rows
    pub n_rows: usize,
    /// Number of columns
    pub n_cols: usize,
    /// Number of row chunks
    pub row_chunks: usize,
}

/// Configuration validator
#[derive(Debug, Clone, Default)]
pub struct ConfigValidator {
    context: Option<ShapeContext>,
}

impl ConfigValidator {
    /// Create a validator without dataset context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dataset shape the configuration will be applied to
    pub fn with_shape(mut self, context: ShapeContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Collect every finding for the configuration
    pub fn validate(&self, config: &BaggingConfig) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        if let Err(err) = config.validate() {
            results.push(ValidationResult::Error(ValidationError {
                parameter: "config".to_string(),
                value: String::new(),
                message: err.to_string(),
            }));
            return results;
        }

        if let Some(ctx) = self.context {
            results.extend(self.validate_shape(config, ctx));
        }

        if results.is_empty() {
            results.push(ValidationResult::Valid);
        }
        results
    }

    /// Validate and turn the first error into a [`BaggingError`], logging warnings
    pub fn check(&self, config: &BaggingConfig) -> Result<()> {
        for result in self.validate(config) {
            match result {
                ValidationResult::Error(err) => return Err(err.into()),
                ValidationResult::Warning(warning) => log::warn!(
                    "{} = {}: {}",
                    warning.parameter,
                    warning.value,
                    warning.message
                ),
                ValidationResult::Valid => {}
            }
        }
        Ok(())
    }

    fn validate_shape(&self, config: &BaggingConfig, ctx: ShapeContext) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        if ctx.n_rows == 0 || ctx.n_cols == 0 {
            results.push(ValidationResult::Error(ValidationError {
                parameter: "dataset".to_string(),
                value: format!("({}, {})", ctx.n_rows, ctx.n_cols),
                message: "dataset must have at least one row and one column".to_string(),
            }));
            return results;
        }

        let sample_size = config.max_samples.resolve_rows(ctx.n_rows);
        let total = sample_size.checked_mul(config.n_estimators);
        if total.map_or(true, |total| total > MAX_SAMPLED_ROWS) {
            results.push(ValidationResult::Error(ValidationError {
                parameter: "max_samples".to_string(),
                value: config.max_samples.to_string(),
                message: format!(
                    "{} estimators drawing {} rows each exceed the limit of {} sampled rows",
                    config.n_estimators, sample_size, MAX_SAMPLED_ROWS
                ),
            }));
        } else if !config.bootstrap && sample_size > ctx.n_rows {
            results.push(ValidationResult::Error(ValidationError {
                parameter: "max_samples".to_string(),
                value: config.max_samples.to_string(),
                message: format!(
                    "cannot draw {} of {} rows without replacement",
                    sample_size, ctx.n_rows
                ),
            }));
        } else if sample_size > ctx.n_rows * 10 {
            results.push(ValidationResult::Warning(ValidationWarning {
                parameter: "max_samples".to_string(),
                value: config.max_samples.to_string(),
                message: format!(
                    "each estimator draws {} rows from a dataset of {}",
                    sample_size, ctx.n_rows
                ),
            }));
        }

        if config.n_estimators > ctx.row_chunks && ctx.row_chunks == 1 {
            results.push(ValidationResult::Warning(ValidationWarning {
                parameter: "n_estimators".to_string(),
                value: config.n_estimators.to_string(),
                message: "dataset has a single row chunk, sampling will not be parallelized"
                    .to_string(),
            }));
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::core::BaggingConfigBuilder;

    fn shape(n_rows: usize, n_cols: usize, row_chunks: usize) -> ShapeContext {
        ShapeContext {
            n_rows,
            n_cols,
            row_chunks,
        }
    }

    #[test]
    fn test_valid_configuration() {
        let config = BaggingConfigBuilder::new().max_samples(10usize).build().unwrap();
        let results = ConfigValidator::new()
            .with_shape(shape(100, 50, 5))
            .validate(&config);
        assert_eq!(results, vec![ValidationResult::Valid]);
    }

    #[test]
    fn test_oversampling_without_replacement() {
        let config = BaggingConfigBuilder::new()
            .max_samples(200usize)
            .bootstrap(false)
            .build()
            .unwrap();
        let validator = ConfigValidator::new().with_shape(shape(100, 50, 5));
        assert!(validator
            .validate(&config)
            .iter()
            .any(|r| matches!(r, ValidationResult::Error(_))));
        assert!(matches!(
            validator.check(&config),
            Err(BaggingError::Configuration { .. })
        ));
    }

    #[test]
    fn test_unrepresentable_sample_size_rejected() {
        let validator = ConfigValidator::new().with_shape(shape(10, 2, 1));

        let huge = BaggingConfigBuilder::new().max_samples(1e30).build().unwrap();
        assert!(matches!(
            validator.check(&huge),
            Err(BaggingError::Configuration { .. })
        ));

        let overflowing = BaggingConfigBuilder::new()
            .n_estimators(4)
            .max_samples(usize::MAX / 2)
            .build()
            .unwrap();
        assert!(validator.check(&overflowing).is_err());

        let at_limit = BaggingConfigBuilder::new()
            .n_estimators(1)
            .max_samples(MAX_SAMPLED_ROWS)
            .build()
            .unwrap();
        assert!(validator
            .validate(&at_limit)
            .iter()
            .all(|r| !matches!(r, ValidationResult::Error(_))));
    }

    #[test]
    fn test_empty_shape_rejected() {
        let config = BaggingConfig::default();
        let validator = ConfigValidator::new().with_shape(shape(0, 50, 1));
        assert!(validator.check(&config).is_err());
    }

    #[test]
    fn test_single_chunk_warning() {
        let config = BaggingConfig::default();
        let results = ConfigValidator::new()
            .with_shape(shape(100, 50, 1))
            .validate(&config);
        assert!(results
            .iter()
            .any(|r| matches!(r, ValidationResult::Warning(w) if w.parameter == "n_estimators")));
        // Warnings do not fail the check.
        assert!(ConfigValidator::new()
            .with_shape(shape(100, 50, 1))
            .check(&config)
            .is_ok());
    }
}
