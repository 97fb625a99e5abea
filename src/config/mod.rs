//! Configuration management for chunked bagging.
//!
//! [`BaggingConfig`] describes a sampling run, [`BaggingConfigBuilder`] builds
//! one with eager parameter checks, and [`ConfigValidator`] checks it against
//! the shape of a concrete dataset.

pub mod core;
pub mod validation;

pub use self::core::{BaggingConfig, BaggingConfigBuilder};
pub use self::validation::{
    ConfigValidator, ShapeContext, ValidationError, ValidationResult, ValidationWarning,
};
