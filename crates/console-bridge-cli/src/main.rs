//! Console bridge entry point

use clap::Parser;
use tracing::{error, info};

use console_bridge_cli::{
    app::BridgeApp,
    cli::Cli,
    config::{AppConfig, Overrides},
    error::Result,
};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    setup_logging(cli.debug);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Console bridge {}", env!("CARGO_PKG_VERSION"));
    if !cli.debug {
        info!("Run with --debug to see raw broker traffic");
    }

    let config = load_configuration(&cli)?;
    let summary = BridgeApp::new(&config).run().await?;

    info!("Goodbye ({})", summary);
    Ok(())
}

/// Setup logging based on the debug flag
///
/// Logs go to stderr so they never interleave with the prompt on stdout.
fn setup_logging(debug: bool) {
    let log_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file, defaults and command line overrides
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    let overrides = Overrides {
        url: cli.url.clone(),
        no_group: cli.no_group,
    };
    Ok(AppConfig::load_with_overrides(&cli.config, &overrides)?)
}
