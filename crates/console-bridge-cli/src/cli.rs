//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::Parser;

/// Configuration file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with a message broker from the terminal", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Broker endpoint, overriding MAIMCORE_URL
    #[arg(long)]
    pub url: Option<String>,

    /// Send direct messages without a group context
    #[arg(long)]
    pub no_group: bool,
}
