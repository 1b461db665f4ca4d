//! Dispatch engine: the assembled set of services behind the HTTP API.
//!
//! The engine is built around one storage service and one notification
//! service, shared through `Arc` with every directory and handler.

pub mod lifecycle;

use crate::clock::Clock;
use crate::directory::{BusinessDirectory, DriverRegistry, ServiceAreaDirectory};
use crate::handlers::OrderHandler;
use crate::query::OrderQuery;
use crate::state::OrderStateMachine;
use dispatch_config::Config;
use dispatch_notification::NotificationService;
use dispatch_storage::StorageService;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Main dispatch engine.
#[derive(Clone)]
pub struct DispatchEngine {
	/// Service configuration.
	pub(crate) config: Config,
	/// Business reference data.
	pub(crate) businesses: Arc<BusinessDirectory>,
	/// Drivers and their availability.
	pub(crate) drivers: Arc<DriverRegistry>,
	/// Serviced zip codes.
	pub(crate) service_areas: Arc<ServiceAreaDirectory>,
	/// Order lifecycle operations.
	pub(crate) order_handler: Arc<OrderHandler>,
	/// Joined order reads.
	pub(crate) order_query: Arc<OrderQuery>,
}

impl DispatchEngine {
	/// Creates a new engine with the given services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		notifications: Arc<NotificationService>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let businesses = Arc::new(BusinessDirectory::new(storage.clone(), clock.clone()));
		let drivers = Arc::new(DriverRegistry::new(storage.clone(), clock.clone()));
		let service_areas = Arc::new(ServiceAreaDirectory::new(storage.clone(), clock.clone()));
		let state_machine = Arc::new(OrderStateMachine::new(storage, clock.clone()));

		let order_handler = Arc::new(OrderHandler::new(
			state_machine.clone(),
			businesses.clone(),
			drivers.clone(),
			service_areas.clone(),
			notifications,
			clock,
		));
		let order_query = Arc::new(OrderQuery::new(
			state_machine,
			businesses.clone(),
			drivers.clone(),
		));

		Self {
			config,
			businesses,
			drivers,
			service_areas,
			order_handler,
			order_query,
		}
	}

	/// Returns a reference to the service configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns the business directory.
	pub fn businesses(&self) -> &Arc<BusinessDirectory> {
		&self.businesses
	}

	/// Returns the driver registry.
	pub fn drivers(&self) -> &Arc<DriverRegistry> {
		&self.drivers
	}

	/// Returns the service area directory.
	pub fn service_areas(&self) -> &Arc<ServiceAreaDirectory> {
		&self.service_areas
	}

	/// Returns the order lifecycle handler.
	pub fn orders(&self) -> &Arc<OrderHandler> {
		&self.order_handler
	}

	/// Returns the order query layer.
	pub fn order_query(&self) -> &Arc<OrderQuery> {
		&self.order_query
	}
}
