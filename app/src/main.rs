//! Courier - command-line client entry point

use anyhow::{Context, Result};
use clap::Parser;
use courier_core::{Config, FileStore, Services};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod terminal;

use cli::Cli;
use commands::Runner;
use terminal::{TerminalNavigator, TerminalNotifier};

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => courier_core::get_config_dir()?.join(courier_core::CONFIG_FILENAME),
    };

    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        .apply_env();
    if let Some(api_url) = &cli.api_url {
        config.api.base_url = api_url.clone();
    }
    if cli.debug {
        config.app.debug = true;
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &Config) {
    let filter = if config.app.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.app.log_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config);

    info!("Starting {} v{}", courier_core::APP_NAME, courier_core::VERSION);
    debug!("API root: {}", config.api_root()?);

    let storage = FileStore::open(config.session_file_path()?)?;
    let navigator = Arc::new(TerminalNavigator::new());
    let services = Services::new(&config, Arc::new(storage), navigator.clone(), Arc::new(TerminalNotifier))?;

    let runner = Runner {
        services,
        navigator,
        json: cli.json,
    };
    runner.run(cli.command).await
}
