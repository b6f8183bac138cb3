//! Error handling for the console bridge CLI

use thiserror::Error;

use crate::config::ConfigError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Bridge(#[from] console_bridge_core::BridgeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
