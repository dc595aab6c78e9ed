//! Runtime error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Out-of-range or malformed configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A host bridge required by an enabled feature was not injected.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// The global tracing subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
