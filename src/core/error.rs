//! Error handling and error types for chunked bagging.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants of
//! [`BaggingError`] follow the failure taxonomy of the planning, gather and
//! reindex layers:
//!
//! - configuration errors are raised synchronously while a plan is built,
//! - shape mismatches are raised before any chunk task is scheduled,
//! - index violations signal a planner bug and are fatal,
//! - storage fetch failures are passed through unchanged from the storage
//!   collaborator and surface only on the chunk that needed the data.

use std::io;
use thiserror::Error;

/// Main error type for the chunked bagging library.
#[derive(Error, Debug)]
pub enum BaggingError {
    /// Invalid `n_estimators`, `max_samples`, `max_features` or seed
    #[error("Configuration error: {parameter} = {value}, {reason}")]
    Configuration {
        /// Name of the offending parameter
        parameter: String,
        /// Value that was supplied
        value: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Label/weight length disagrees with the dataset, or a reindex target is too narrow
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },

    /// A sampled or selected index falls outside its declared bound
    #[error("Index out of range in {context}: index {index}, bound {bound}")]
    IndexOutOfRange {
        /// Offending index
        index: usize,
        /// Exclusive upper bound
        bound: usize,
        /// Where the index was being resolved
        context: String,
    },

    /// Failure reported by the storage collaborator
    #[error("Storage fetch error for chunk {key}: {message}")]
    StorageFetch {
        /// Key of the chunk that could not be fetched
        key: String,
        /// Message reported by the storage layer
        message: String,
    },

    /// A chunk task panicked or its result channel was dropped
    #[error("Task failed: {message}")]
    TaskFailed {
        /// Description of the failure
        message: String,
    },

    /// Array shape errors raised by ndarray while stitching chunks
    #[error("Array shape error: {source}")]
    Shape {
        /// Underlying ndarray error
        #[from]
        source: ndarray::ShapeError,
    },

    /// File I/O errors
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: io::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        /// Underlying serde_json error
        #[from]
        source: serde_json::Error,
    },

    /// Bincode serialization errors
    #[error("Bincode error: {source}")]
    Bincode {
        /// Underlying bincode error
        #[from]
        source: bincode::Error,
    },

    /// TOML parse or serialization errors
    #[error("TOML error: {message}")]
    Toml {
        /// Error message from the toml crate
        message: String,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the violated invariant
        message: String,
    },
}

/// Type alias for Results using BaggingError
pub type Result<T> = std::result::Result<T, BaggingError>;

impl BaggingError {
    /// Create a configuration error
    pub fn configuration<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        BaggingError::Configuration {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        BaggingError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an index out of range error
    pub fn index_out_of_range<C: Into<String>>(index: usize, bound: usize, context: C) -> Self {
        BaggingError::IndexOutOfRange {
            index,
            bound,
            context: context.into(),
        }
    }

    /// Create a storage fetch error
    pub fn storage_fetch<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        BaggingError::StorageFetch {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a task failure error
    pub fn task_failed<S: Into<String>>(message: S) -> Self {
        BaggingError::TaskFailed {
            message: message.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        BaggingError::Internal {
            message: message.into(),
        }
    }

    /// Check if retrying the failed operation could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BaggingError::StorageFetch { .. } | BaggingError::TaskFailed { .. }
        )
    }

    /// Check if this error indicates a broken internal invariant
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BaggingError::IndexOutOfRange { .. } | BaggingError::Internal { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            BaggingError::Configuration { .. } => "configuration",
            BaggingError::ShapeMismatch { .. } => "shape_mismatch",
            BaggingError::IndexOutOfRange { .. } => "index_out_of_range",
            BaggingError::StorageFetch { .. } => "storage_fetch",
            BaggingError::TaskFailed { .. } => "task_failed",
            BaggingError::Shape { .. } => "shape",
            BaggingError::Io { .. } => "io",
            BaggingError::Json { .. } => "json",
            BaggingError::Bincode { .. } => "bincode",
            BaggingError::Toml { .. } => "toml",
            BaggingError::Internal { .. } => "internal",
        }
    }
}

impl From<toml::de::Error> for BaggingError {
    fn from(err: toml::de::Error) -> Self {
        BaggingError::Toml {
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for BaggingError {
    fn from(err: toml::ser::Error) -> Self {
        BaggingError::Toml {
            message: err.to_string(),
        }
    }
}

/// Build a [`BaggingError::Configuration`] with a formatted reason.
#[macro_export]
macro_rules! config_error {
    ($param:expr, $value:expr, $reason:expr) => {
        $crate::core::error::BaggingError::configuration($param, $value.to_string(), $reason)
    };
    ($param:expr, $value:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::core::error::BaggingError::configuration(
            $param,
            $value.to_string(),
            format!($fmt, $($arg)*),
        )
    };
}

/// Return early with the given error when the condition does not hold.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
