//! Main entry point for the order dispatch service.
//!
//! This binary loads the configuration, builds the dispatch engine with the
//! storage and notification backends it names, seeds the configured service
//! areas and serves the HTTP API until interrupted.

use clap::Parser;
use dispatch_config::Config;
use dispatch_core::{BuilderError, DispatchBuilder, DispatchEngine, DispatchFactories};
use dispatch_notification::NotificationFactory;
use dispatch_storage::StorageFactory;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the dispatch service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// RUST_LOG wins over --log-level
	use tracing_subscriber::{fmt, EnvFilter};
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started dispatch service");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = Arc::new(build_engine(config.clone())?);
	engine.initialize().await?;

	match config.api.as_ref().filter(|api| api.enabled) {
		Some(api_config) => server::start_server(api_config.clone(), Arc::clone(&engine)).await?,
		None => tracing::warn!("API server disabled in configuration, nothing to serve"),
	}

	engine.shutdown().await?;
	tracing::info!("Stopped dispatch service");
	Ok(())
}

/// Collects the factories of every backend compiled into this binary.
fn engine_factories() -> DispatchFactories<StorageFactory, NotificationFactory> {
	DispatchFactories {
		storage_factories: dispatch_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		notification_factories: dispatch_notification::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	}
}

/// Builds the dispatch engine with the backends named in `config`.
fn build_engine(config: Config) -> Result<DispatchEngine, BuilderError> {
	DispatchBuilder::new(config).build(engine_factories())
}
