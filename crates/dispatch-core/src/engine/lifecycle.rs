//! Lifecycle management for the dispatch engine.
//!
//! Handles initialization and shutdown procedures for the engine.

use super::{DispatchEngine, EngineError};

impl DispatchEngine {
	/// Performs any initialization required before serving requests.
	///
	/// Upserts the service areas declared in configuration.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(service_id = %self.config.service.id, "Initializing dispatch engine");

		let seeded = self
			.service_areas
			.seed(&self.config.service_areas)
			.await
			.map_err(|e| EngineError::Config(format!("Failed to seed service areas: {}", e)))?;
		if seeded > 0 {
			tracing::info!(count = seeded, "Seeded service areas from configuration");
		}
		Ok(())
	}

	/// Performs cleanup operations.
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!(service_id = %self.config.service.id, "Shutting down dispatch engine");
		Ok(())
	}
}
