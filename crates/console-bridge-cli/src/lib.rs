//! Console Bridge CLI library
//!
//! Argument parsing, layered configuration loading, and the wiring that runs
//! a console session against a broker.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::BridgeApp;
pub use cli::{Cli, DEFAULT_CONFIG_PATH};
pub use config::{AppConfig, BridgeSettings, ConfigError, Overrides};
pub use error::{CliError, Result};
