//! Configuration builder for tests and embedded use.

use crate::{
	ApiConfig, Config, NotificationConfig, ServiceAreaSeed, ServiceConfig, StorageConfig,
};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to in-memory storage and the logging notifier, which is what most
/// tests want.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	storage_primary: String,
	storage_config: toml::Value,
	notification_primary: String,
	notification_config: toml::Value,
	max_concurrent_notifications: usize,
	api: Option<ApiConfig>,
	service_areas: Vec<ServiceAreaSeed>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		Self {
			service_id: "dispatch-test".to_string(),
			storage_primary: "memory".to_string(),
			storage_config: toml::Value::Table(toml::map::Map::new()),
			notification_primary: "log".to_string(),
			notification_config: toml::Value::Table(toml::map::Map::new()),
			max_concurrent_notifications: 4,
			api: None,
			service_areas: Vec::new(),
		}
	}

	/// Sets the service ID.
	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Sets the primary storage implementation and its table.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	/// Sets the primary notification implementation and its table.
	pub fn notification(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.notification_primary = primary.into();
		self.notification_config = config;
		self
	}

	/// Sets the notification concurrency bound.
	pub fn max_concurrent_notifications(mut self, max: usize) -> Self {
		self.max_concurrent_notifications = max;
		self
	}

	/// Sets the API configuration.
	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Adds a service area seeded at startup.
	pub fn service_area(mut self, zip_code: &str, min: u32, max: u32, expected: u32) -> Self {
		self.service_areas.push(ServiceAreaSeed {
			zip_code: zip_code.to_string(),
			min_delivery_minutes: min,
			max_delivery_minutes: max,
			expected_delivery_minutes: expected,
		});
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			storage: StorageConfig {
				implementations: HashMap::from([(
					self.storage_primary.clone(),
					self.storage_config,
				)]),
				primary: self.storage_primary,
			},
			notification: NotificationConfig {
				implementations: HashMap::from([(
					self.notification_primary.clone(),
					self.notification_config,
				)]),
				primary: self.notification_primary,
				max_concurrent: self.max_concurrent_notifications,
			},
			api: self.api,
			service_areas: self.service_areas,
		}
	}
}
