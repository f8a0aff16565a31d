//! Unified error handling for the runtime.

use crate::config::ConfigError;

/// Runtime error type.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Engine error: {0}")]
    Engine(#[from] formwork_engine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
