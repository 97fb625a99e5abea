//! Bagging configuration structure and builder.
//!
//! [`BaggingConfig`] holds every knob of the sampling planner. It can be built
//! programmatically through [`BaggingConfigBuilder`], loaded from a JSON or
//! TOML file, or overridden from `BAGGING_*` environment variables.

use crate::core::constants::*;
use crate::core::error::{BaggingError, Result};
use crate::core::types::SampleSize;
use crate::{config_error, ensure};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Configuration of the bagging sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaggingConfig {
    /// Number of estimators in the ensemble
    pub n_estimators: usize,
    /// Rows drawn per estimator (count, or fraction of the dataset rows)
    pub max_samples: SampleSize,
    /// Features selected per estimator (count, or fraction of the columns)
    pub max_features: SampleSize,
    /// Draw rows with replacement
    pub bootstrap: bool,
    /// Base seed of the per-estimator random substreams (None = entropy)
    pub random_seed: Option<u64>,
    /// Number of worker threads for the rayon executor (0 = all cores)
    pub num_threads: usize,
    /// Verify every planned index against the dataset bounds after planning
    pub validate_plan: bool,
}

impl Default for BaggingConfig {
    fn default() -> Self {
        BaggingConfig {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_samples: DEFAULT_MAX_SAMPLES,
            max_features: DEFAULT_MAX_FEATURES,
            bootstrap: DEFAULT_BOOTSTRAP,
            random_seed: None,
            num_threads: DEFAULT_NUM_THREADS,
            validate_plan: true,
        }
    }
}

impl BaggingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the shape-independent parameters
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.n_estimators > 0,
            config_error!("n_estimators", self.n_estimators, "must be at least 1")
        );
        ensure!(
            self.max_samples.is_positive(),
            config_error!(
                "max_samples",
                self.max_samples,
                "must be a positive count or a positive finite fraction"
            )
        );
        ensure!(
            self.max_features.is_positive(),
            config_error!(
                "max_features",
                self.max_features,
                "must be a positive count or a positive finite fraction"
            )
        );

        if self.num_threads > num_cpus::get() * 2 {
            log::warn!(
                "num_threads ({}) is much larger than available cores ({})",
                self.num_threads,
                num_cpus::get()
            );
        }

        Ok(())
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: BaggingConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(config_error!(
                    "config_file",
                    path.display(),
                    "unsupported format, use .json or .toml"
                ))
            }
        };

        config.validate()?;
        log::debug!("Loaded bagging configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)?,
            _ => {
                return Err(config_error!(
                    "config_file",
                    path.display(),
                    "unsupported format, use .json or .toml"
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from `BAGGING_*` environment variables on top of the defaults
    pub fn load_from_environment() -> Result<Self> {
        let mut config = BaggingConfig::default();
        config.apply_environment_overrides()?;
        Ok(config)
    }

    /// Override fields for which a `BAGGING_*` environment variable is set
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("N_ESTIMATORS") {
            self.n_estimators = parse_env("N_ESTIMATORS", &val)?;
        }
        if let Some(val) = env_var("MAX_SAMPLES") {
            self.max_samples = parse_sample_size("MAX_SAMPLES", &val)?;
        }
        if let Some(val) = env_var("MAX_FEATURES") {
            self.max_features = parse_sample_size("MAX_FEATURES", &val)?;
        }
        if let Some(val) = env_var("BOOTSTRAP") {
            self.bootstrap = parse_env("BOOTSTRAP", &val)?;
        }
        if let Some(val) = env_var("RANDOM_SEED") {
            self.random_seed = Some(parse_env("RANDOM_SEED", &val)?);
        }
        if let Some(val) = env_var("NUM_THREADS") {
            self.num_threads = parse_env("NUM_THREADS", &val)?;
        }

        self.validate()
    }

    /// Get the effective number of threads (0 means use all available cores)
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }

    /// Get configuration as a parameter map (for logging)
    pub fn as_parameter_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("n_estimators".to_string(), self.n_estimators.to_string());
        map.insert("max_samples".to_string(), self.max_samples.to_string());
        map.insert("max_features".to_string(), self.max_features.to_string());
        map.insert("bootstrap".to_string(), self.bootstrap.to_string());
        map.insert(
            "random_seed".to_string(),
            self.random_seed
                .map_or_else(|| "entropy".to_string(), |s| s.to_string()),
        );
        map.insert("num_threads".to_string(), self.num_threads.to_string());
        map
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn parse_env<T: std::str::FromStr>(name: &str, val: &str) -> Result<T> {
    val.trim().parse().map_err(|_| {
        BaggingError::configuration(
            format!("{}{}", ENV_PREFIX, name),
            val,
            "could not be parsed",
        )
    })
}

/// Integers are counts, anything with a decimal point or exponent is a fraction.
fn parse_sample_size(name: &str, val: &str) -> Result<SampleSize> {
    let val = val.trim();
    if let Ok(count) = val.parse::<usize>() {
        return Ok(SampleSize::Count(count));
    }
    parse_env::<f64>(name, val).map(SampleSize::Fraction)
}

/// Builder for [`BaggingConfig`] that collects validation errors until `build()`.
#[derive(Debug, Default)]
pub struct BaggingConfigBuilder {
    config: BaggingConfig,
    validation_errors: Vec<String>,
}

impl BaggingConfigBuilder {
    /// Create a new builder starting from the defaults
    pub fn new() -> Self {
        BaggingConfigBuilder {
            config: BaggingConfig::default(),
            validation_errors: Vec::new(),
        }
    }

    /// Set number of estimators
    pub fn n_estimators(mut self, n_estimators: usize) -> Self {
        if n_estimators == 0 {
            self.validation_errors
                .push("n_estimators must be at least 1".to_string());
        }
        self.config.n_estimators = n_estimators;
        self
    }

    /// Set rows drawn per estimator
    pub fn max_samples<S: Into<SampleSize>>(mut self, max_samples: S) -> Self {
        let max_samples = max_samples.into();
        if !max_samples.is_positive() {
            self.validation_errors
                .push(format!("max_samples must be positive, got {}", max_samples));
        }
        self.config.max_samples = max_samples;
        self
    }

    /// Set features selected per estimator
    pub fn max_features<S: Into<SampleSize>>(mut self, max_features: S) -> Self {
        let max_features = max_features.into();
        if !max_features.is_positive() {
            self.validation_errors
                .push(format!("max_features must be positive, got {}", max_features));
        }
        self.config.max_features = max_features;
        self
    }

    /// Draw rows with or without replacement
    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.config.bootstrap = bootstrap;
        self
    }

    /// Set the base seed
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = Some(seed);
        self
    }

    /// Set number of executor threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    /// Enable or disable post-planning index verification
    pub fn validate_plan(mut self, validate: bool) -> Self {
        self.config.validate_plan = validate;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<BaggingConfig> {
        if !self.validation_errors.is_empty() {
            return Err(BaggingError::configuration(
                "config",
                "builder",
                self.validation_errors.join(", "),
            ));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}
