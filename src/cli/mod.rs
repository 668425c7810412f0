//! CLI module for the catalog cache
//!
//! - `serve`: run the caching HTTP server
//! - `fetch`: exercise the caller-side client against a running server

pub mod fetch;
pub mod serve;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;

/// Catalog cache - conditional HTTP caching with coalesced generation
#[derive(Parser)]
#[command(name = "pmp-catalog-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the caching HTTP server
    Serve,

    /// Fetch the product listing through the client cache
    Fetch(fetch::FetchArgs),
}

/// Loads `.env` and configuration, installs logging, then reports a failed
/// load so a broken config file is never silently replaced by defaults
pub(crate) fn init_from_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let (config, load_error) = config_or_defaults(AppConfig::load());
    init_logging(&config.logging)?;

    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load configuration, using defaults");
    }

    Ok(config)
}

fn config_or_defaults(
    loaded: Result<AppConfig, config::ConfigError>,
) -> (AppConfig, Option<config::ConfigError>) {
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    }
}
