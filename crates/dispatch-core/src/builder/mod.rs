//! Builder pattern for constructing dispatch engines.
//!
//! Backends are chosen by name from the configuration and created through
//! factory maps, so the binary decides which implementations exist and tests
//! can substitute their own.

use crate::clock::{Clock, SystemClock};
use crate::engine::DispatchEngine;
use dispatch_config::Config;
use dispatch_notification::{NotificationError, NotificationInterface, NotificationService};
use dispatch_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by implementation
/// name.
pub struct DispatchFactories<SF, NF> {
	pub storage_factories: HashMap<String, SF>,
	pub notification_factories: HashMap<String, NF>,
}

/// Builder for constructing a DispatchEngine with pluggable implementations.
pub struct DispatchBuilder {
	config: Config,
	clock: Arc<dyn Clock>,
}

impl DispatchBuilder {
	/// Creates a new DispatchBuilder using the system clock.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			clock: Arc::new(SystemClock),
		}
	}

	/// Replaces the clock used for timestamps and delivery windows.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	/// Builds the engine from the primary storage and notification
	/// implementations named in the configuration.
	pub fn build<SF, NF>(self, factories: DispatchFactories<SF, NF>) -> Result<DispatchEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		NF: Fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotificationError>,
	{
		let storage_backend = create_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let notification_backend = create_primary(
			"notification",
			&self.config.notification.primary,
			&self.config.notification.implementations,
			&factories.notification_factories,
		)?;
		let notifications = Arc::new(NotificationService::new(
			notification_backend,
			self.config.notification.max_concurrent,
		));

		Ok(DispatchEngine::new(
			self.config,
			storage,
			notifications,
			self.clock,
		))
	}
}

/// Runs the factory of the primary implementation of one component.
///
/// Only the primary is built; other configured implementations are logged
/// and left alone.
fn create_primary<T: ?Sized, E, F>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	E: std::fmt::Display,
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	for name in implementations.keys().filter(|name| name.as_str() != primary) {
		tracing::debug!(component, implementation = %name, "Configured but not primary");
	}

	let config = implementations.get(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' not found in implementations",
			component, primary
		))
	})?;
	let factory = factories.get(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!("{} implementation '{}'", component, primary))
	})?;

	match factory(config) {
		Ok(implementation) => {
			tracing::info!(component, implementation = %primary, "Loaded");
			Ok(implementation)
		},
		Err(e) => {
			tracing::error!(
				component,
				implementation = %primary,
				error = %e,
				"Failed to create implementation"
			);
			Err(BuilderError::Config(format!(
				"Failed to create {} implementation '{}': {}",
				component, primary, e
			)))
		},
	}
}
