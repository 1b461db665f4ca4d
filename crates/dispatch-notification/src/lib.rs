//! Notification gateway for the dispatch system.
//!
//! The lifecycle engine tells businesses about their orders through this
//! gateway. Sending is best effort: [`NotificationService::dispatch_detached`]
//! runs the send on its own task, so a slow or failing mail relay is only ever
//! visible in the logs, never in the response of the request that caused it.

use async_trait::async_trait;
use dispatch_types::{ConfigSchema, ImplementationRegistry, Notification};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod webhook;
}

/// Errors that can occur while sending notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
	/// The transport could not reach the relay.
	#[error("Network error: {0}")]
	Network(String),
	/// The relay answered but refused the message.
	#[error("Delivery rejected: {0}")]
	Rejected(String),
	/// The implementation's configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for notification transports.
#[async_trait]
pub trait NotificationInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Sends one message.
	async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Type alias for notification factory functions.
pub type NotificationFactory =
	fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotificationError>;

/// Registry trait for notification implementations.
pub trait NotificationRegistry: ImplementationRegistry<Factory = NotificationFactory> {}

/// Get all registered notification implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, NotificationFactory)> {
	use implementations::{log, webhook};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(webhook::Registry::NAME, webhook::Registry::factory()),
	]
}

/// Service that sends notifications without blocking its callers.
pub struct NotificationService {
	/// Transport used for every message.
	backend: Arc<dyn NotificationInterface>,
	/// Bounds the number of sends in flight.
	permits: Arc<Semaphore>,
}

impl NotificationService {
	/// Creates a new NotificationService sending at most `max_concurrent`
	/// messages at a time.
	pub fn new(backend: Box<dyn NotificationInterface>, max_concurrent: usize) -> Self {
		Self {
			backend: Arc::from(backend),
			permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
		}
	}

	/// Sends a message on a detached task.
	///
	/// The permit is taken before spawning: when `max_concurrent` sends are
	/// already in flight the message is logged and dropped, and `None` is
	/// returned. Send failures are logged and dropped as well. The returned
	/// handle may be ignored; tests await it to observe completion.
	pub fn dispatch_detached(&self, notification: Notification) -> Option<JoinHandle<()>> {
		let permit = match Arc::clone(&self.permits).try_acquire_owned() {
			Ok(permit) => permit,
			Err(e) => {
				tracing::warn!(
					to = %notification.to,
					subject = %notification.subject,
					error = %e,
					"Notification dropped"
				);
				return None;
			},
		};

		let backend = Arc::clone(&self.backend);
		Some(tokio::spawn(async move {
			let _permit = permit;
			match backend.send(&notification).await {
				Ok(()) => tracing::debug!(to = %notification.to, subject = %notification.subject, "Notification sent"),
				Err(e) => tracing::warn!(
					to = %notification.to,
					subject = %notification.subject,
					error = %e,
					"Notification failed"
				),
			}
		}))
	}
}
