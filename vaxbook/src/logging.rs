//! Subscriber setup for binaries and test harnesses.
//!
//! Library code only emits `tracing` events; nothing is printed until a
//! subscriber is installed. Filtering follows `RUST_LOG` and falls back to
//! `info`.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The fallback directive is not a valid filter.
    #[error("invalid log directive {directive:?}: {source}")]
    InvalidDirective {
        /// The rejected directive.
        directive: String,
        /// Parser failure.
        source: ParseError,
    },

    /// A global subscriber was already installed.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Installs a formatted subscriber filtered by `RUST_LOG`, defaulting to
/// `info`.
pub fn init() -> Result<(), LoggingError> {
    init_with_default(DEFAULT_DIRECTIVE)
}

/// Installs a formatted subscriber filtered by `RUST_LOG`, defaulting to
/// `directive`.
pub fn init_with_default(directive: &str) -> Result<(), LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive).map_err(|source| {
            LoggingError::InvalidDirective {
                directive: directive.to_string(),
                source,
            }
        })?,
    };

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()?;
    Ok(())
}
