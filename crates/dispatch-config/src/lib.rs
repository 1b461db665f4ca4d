//! Configuration module for the order dispatch service.
//!
//! Configuration is loaded from a TOML file. String values may reference
//! environment variables as `${VAR}` or `${VAR:-default}`, and a file may pull
//! in other files through `include = [...]` (see [`loader`]). The parsed
//! configuration is validated before it is handed to the engine builder.

pub mod builders;
mod loader;

pub use builders::config::ConfigBuilder;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only, the error's Display dumps the whole input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the dispatch service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the notification gateway.
	pub notification: NotificationConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
	/// Service areas upserted into storage at startup.
	#[serde(default)]
	pub service_areas: Vec<ServiceAreaSeed>,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier used in logs.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the notification gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Upper bound on notifications being sent at the same time. Messages
	/// beyond it are dropped with a warning.
	#[serde(default = "default_max_concurrent_notifications")]
	pub max_concurrent: usize,
	/// Map of notification implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

fn default_max_concurrent_notifications() -> usize {
	16
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// Directory served for paths no API route matches.
	pub static_dir: Option<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// A service area declared in configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServiceAreaSeed {
	pub zip_code: String,
	pub min_delivery_minutes: u32,
	pub max_delivery_minutes: u32,
	pub expected_delivery_minutes: u32,
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable VAR_NAME,
/// or with `default` for `${VAR_NAME:-default}` when the variable is unset.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	// Bounded input keeps the regex scan cheap
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Deserializes and validates an already merged TOML document.
	pub(crate) fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
		let config: Config = value.try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration.
	///
	/// Backend tables themselves are validated by each backend's factory.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if !self
			.notification
			.implementations
			.contains_key(&self.notification.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary notification '{}' not found in implementations",
				self.notification.primary
			)));
		}
		if self.notification.max_concurrent == 0 {
			return Err(ConfigError::Validation(
				"notification.max_concurrent must be at least 1".into(),
			));
		}

		for area in &self.service_areas {
			if area.zip_code.is_empty() {
				return Err(ConfigError::Validation(
					"Service area zip_code cannot be empty".into(),
				));
			}
			let ordered = area.min_delivery_minutes <= area.expected_delivery_minutes
				&& area.expected_delivery_minutes <= area.max_delivery_minutes;
			if !ordered {
				return Err(ConfigError::Validation(format!(
					"Service area {} must satisfy min <= expected <= max delivery minutes",
					area.zip_code
				)));
			}
		}

		Ok(())
	}
}

/// Parses a configuration from TOML text, resolving environment variables
/// and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let value: toml::Value = toml::from_str(&resolved)?;
		Config::from_value(value)
	}
}
