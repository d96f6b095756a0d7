//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup so `main` can
//! propagate with `?`. Nothing after startup returns an error.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hivefall_core::config::ConfigError,
    },

    /// The `demo` section of the config file could not be read.
    #[error("demo config error: {message}")]
    Demo {
        /// Description of the failure.
        message: String,
    },
}
