//! Main entry point for the order relay service.
//!
//! Loads the configuration, assembles the relay engine from the configured
//! storage and gateway implementations, and runs the staff event loop next to
//! the HTTP submission API.

use clap::Parser;
use orderbot_config::Config;
use orderbot_core::{OrderEngine, RelayBuilder, RelayFactories};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the relay service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "ORDERBOT_CONFIG", default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started relay");

	// Missing settings abort here, before any service exists
	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = Arc::new(build_engine(config.clone()).await?);

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			let engine_task = engine.run();
			let api_task = server::start_server(api_config, Arc::clone(&engine));

			tokio::select! {
				result = engine_task => {
					tracing::info!("Relay engine finished");
					result?;
				}
				result = api_task => {
					tracing::info!("API server finished");
					result?;
				}
			}
		},
		None => {
			tracing::info!("Starting relay without API");
			engine.run().await?;
		},
	}

	tracing::info!("Stopped relay");
	Ok(())
}

/// Builds the engine with every storage and gateway implementation
/// registered under its config name.
async fn build_engine(config: Config) -> Result<OrderEngine, Box<dyn std::error::Error>> {
	let factories = RelayFactories {
		storage_factories: orderbot_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		gateway_factories: orderbot_notify::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	};

	Ok(RelayBuilder::new(config).build(factories).await?)
}
