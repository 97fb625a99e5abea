//! Core infrastructure shared by every component of the crate.
//!
//! - [`types`]: index aliases, [`SampleSize`] and [`DataKind`]
//! - [`constants`]: configuration defaults
//! - [`error`]: the [`BaggingError`] taxonomy and [`Result`] alias

pub mod constants;
pub mod error;
pub mod types;

pub use constants::*;
pub use error::{BaggingError, Result};
pub use types::*;

use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Install `env_logger` as the `log` backend.
///
/// Defaults the filter to `info` when `RUST_LOG` is unset. Safe to call more
/// than once; only the first call has an effect, and an already installed
/// logger is left in place.
pub fn initialize_logging() {
    LOGGING_INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        let _ = env_logger::Builder::from_env(env).try_init();
        log::debug!("chunked-bagging {} logging initialized", CHUNKED_BAGGING_VERSION);
    });
}
