//! Notification transport that writes messages to the log.
//!
//! Used in development and tests where no mail relay is available.

use crate::{NotificationError, NotificationFactory, NotificationInterface, NotificationRegistry};
use async_trait::async_trait;
use dispatch_types::{ConfigSchema, ImplementationRegistry, Notification, Schema, ValidationError};

/// Transport that logs every message at info level.
pub struct LogNotifier;

#[async_trait]
impl NotificationInterface for LogNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}

	async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
		tracing::info!(
			to = %notification.to,
			subject = %notification.subject,
			body = %notification.body,
			"Notification"
		);
		Ok(())
	}
}

/// Configuration schema for LogNotifier. It takes no options.
pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a log notifier from configuration.
pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotificationError> {
	LogNotifierSchema
		.validate(config)
		.map_err(|e| NotificationError::Configuration(e.to_string()))?;
	Ok(Box::new(LogNotifier))
}

/// Registry for the log notifier.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}
