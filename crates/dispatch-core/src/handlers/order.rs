//! Order handler for creating orders and driving them to delivery.
//!
//! Orders and drivers live under separate keys and storage has no
//! transaction spanning both. Assignment therefore claims the driver first and
//! writes the order second, releasing the driver again if the order write
//! fails. A crash between those two writes leaves a busy driver without an
//! order; nothing here repairs that.

use crate::clock::Clock;
use crate::directory::{BusinessDirectory, DirectoryError, DriverRegistry, ServiceAreaDirectory};
use crate::state::{OrderStateError, OrderStateMachine};
use crate::utils::{truncate_id, validation_message};
use chrono::Duration;
use dispatch_notification::NotificationService;
use dispatch_types::{
	AssignDriverRequest, CreateOrderRequest, Driver, Notification, Order, OrderStatus,
	SetStatusRequest, UpdateOrderRequest,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Errors returned by order lifecycle operations.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("{0}")]
	Validation(String),
	#[error("Zip code not serviced")]
	UnservicedZip(String),
	#[error("Cannot update after pickup")]
	OrderLocked,
	#[error("Cannot cancel assigned order")]
	AssignmentConflict,
	#[error("No driver available")]
	NoDriverAvailable,
	#[error("Invalid status transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("{0} not found")]
	NotFound(&'static str),
	#[error("Order {0} was modified concurrently")]
	ConcurrentModification(String),
	#[error("{0}")]
	Storage(String),
}

impl From<OrderStateError> for OrderError {
	fn from(err: OrderStateError) -> Self {
		match err {
			OrderStateError::OrderNotFound(_) => OrderError::NotFound("Order"),
			OrderStateError::InvalidTransition { from, to } => {
				OrderError::InvalidTransition { from, to }
			},
			OrderStateError::ConcurrentModification(id) => OrderError::ConcurrentModification(id),
			OrderStateError::Storage(message) => OrderError::Storage(message),
		}
	}
}

impl OrderError {
	/// Converts a directory failure met while working on `order_id`.
	fn from_directory(order_id: &str, err: DirectoryError) -> Self {
		match err {
			DirectoryError::Validation(message) => OrderError::Validation(message),
			DirectoryError::NotFound(kind) => OrderError::NotFound(kind),
			DirectoryError::Conflict(_) => OrderError::ConcurrentModification(order_id.to_string()),
			DirectoryError::Storage(message) => OrderError::Storage(message),
		}
	}
}

/// Handler for the order lifecycle.
pub struct OrderHandler {
	state_machine: Arc<OrderStateMachine>,
	businesses: Arc<BusinessDirectory>,
	drivers: Arc<DriverRegistry>,
	service_areas: Arc<ServiceAreaDirectory>,
	notifications: Arc<NotificationService>,
	clock: Arc<dyn Clock>,
}

impl OrderHandler {
	pub fn new(
		state_machine: Arc<OrderStateMachine>,
		businesses: Arc<BusinessDirectory>,
		drivers: Arc<DriverRegistry>,
		service_areas: Arc<ServiceAreaDirectory>,
		notifications: Arc<NotificationService>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			state_machine,
			businesses,
			drivers,
			service_areas,
			notifications,
			clock,
		}
	}

	/// Creates an order with its delivery window fixed from the zip code.
	#[instrument(skip_all, fields(business_id = %truncate_id(&request.business_id), zip = %request.customer_zip_code))]
	pub async fn create(&self, request: CreateOrderRequest) -> Result<Order, OrderError> {
		request
			.validate()
			.map_err(|e| OrderError::Validation(validation_message(&e)))?;

		let business = self
			.businesses
			.find(&request.business_id)
			.await
			.map_err(|e| OrderError::Storage(e.to_string()))?
			.ok_or_else(|| OrderError::Validation("Business not found".into()))?;

		let area = self
			.service_areas
			.lookup(&request.customer_zip_code)
			.await
			.map_err(|e| OrderError::Storage(e.to_string()))?
			.ok_or_else(|| OrderError::UnservicedZip(request.customer_zip_code.clone()))?;

		let now = self.clock.now();
		let minutes = |m: u32| Duration::minutes(i64::from(m));
		let order = Order {
			id: Uuid::new_v4().to_string(),
			business_id: business.id.clone(),
			customer_name: request.customer_name,
			customer_phone: request.customer_phone,
			delivery_address: request.delivery_address,
			customer_zip_code: request.customer_zip_code,
			order_items: request.order_items,
			order_status: OrderStatus::Received,
			assigned_driver_id: None,
			min_delivery_time: now + minutes(area.min_delivery_time),
			max_delivery_time: now + minutes(area.max_delivery_time),
			expected_delivery_time: now + minutes(area.expected_delivery_time),
			actual_delivery_time: None,
			created_at: now,
			updated_at: now,
		};
		self.state_machine.store_order(&order).await?;

		tracing::info!(order_id = %truncate_id(&order.id), "Order received");

		if let Some(email) = &business.email {
			self.notifications.dispatch_detached(Notification {
				to: email.clone(),
				subject: "Order received".into(),
				body: format!(
					"Order {} has been received.\nItems: {}\nExpected delivery: {}",
					order.id,
					order.order_items,
					order.expected_delivery_time.to_rfc3339()
				),
			});
		}

		Ok(order)
	}

	/// Edits destination and item fields of an order not yet picked up.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn update(
		&self,
		order_id: &str,
		request: UpdateOrderRequest,
	) -> Result<Order, OrderError> {
		request
			.validate()
			.map_err(|e| OrderError::Validation(validation_message(&e)))?;

		self.state_machine
			.update_order_with(order_id, |order| {
				if !order.order_status.is_editable() {
					return Err(OrderError::OrderLocked);
				}
				if let Some(name) = &request.customer_name {
					order.customer_name = name.clone();
				}
				if let Some(phone) = &request.customer_phone {
					order.customer_phone = Some(phone.clone());
				}
				if let Some(address) = &request.delivery_address {
					order.delivery_address = address.clone();
				}
				if let Some(items) = &request.order_items {
					order.order_items = items.clone();
				}
				Ok(true)
			})
			.await
	}

	/// Cancels an order that has no driver.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn cancel(&self, order_id: &str) -> Result<Order, OrderError> {
		let order = self
			.state_machine
			.update_order_with(order_id, |order| {
				if order.order_status == OrderStatus::Cancelled {
					return Ok(false);
				}
				if order.assigned_driver_id.is_some() {
					return Err(OrderError::AssignmentConflict);
				}
				OrderStateMachine::ensure_transition(order.order_status, OrderStatus::Cancelled)?;
				order.order_status = OrderStatus::Cancelled;
				Ok(true)
			})
			.await?;

		tracing::info!("Order cancelled");
		Ok(order)
	}

	/// Assigns a driver, either the one named or any available one.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), auto = request.auto_assign))]
	pub async fn assign(
		&self,
		order_id: &str,
		request: AssignDriverRequest,
	) -> Result<Order, OrderError> {
		let requested = match (&request.driver_id, request.auto_assign) {
			(_, true) => None,
			(Some(driver_id), false) => Some(driver_id.as_str()),
			(None, false) => {
				return Err(OrderError::Validation(
					"driverId is required when autoAssign is false".into(),
				))
			},
		};

		let order = self.state_machine.get_order(order_id).await?;
		OrderStateMachine::ensure_transition(order.order_status, OrderStatus::Assigned)?;
		if let Some(driver_id) = requested {
			if order.assigned_driver_id.as_deref() == Some(driver_id) {
				return Ok(order);
			}
		}

		let driver = match requested {
			Some(driver_id) => self.claim_named(order_id, driver_id).await?,
			None => self.claim_any(order_id).await?,
		};

		let mut previous_driver = None;
		let result: Result<Order, OrderError> = self
			.state_machine
			.update_order_with(order_id, |order| {
				OrderStateMachine::ensure_transition(order.order_status, OrderStatus::Assigned)?;
				previous_driver = order.assigned_driver_id.clone();
				order.assigned_driver_id = Some(driver.id.clone());
				order.order_status = OrderStatus::Assigned;
				Ok(true)
			})
			.await;

		let order = match result {
			Ok(order) => order,
			Err(e) => {
				self.release_or_log(&driver.id, "compensation").await;
				return Err(e);
			},
		};

		if let Some(previous) = previous_driver.filter(|p| *p != driver.id) {
			self.release_or_log(&previous, "reassignment").await;
		}

		tracing::info!(driver_id = %truncate_id(&driver.id), "Driver assigned");
		Ok(order)
	}

	/// Moves an order to a new status.
	///
	/// `assigned` is only reachable through [`assign`](Self::assign).
	/// Reaching `delivered` stamps the delivery time and frees the driver; if
	/// the driver cannot be freed the order is put back and the error returned.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), status = %request.status))]
	pub async fn set_status(
		&self,
		order_id: &str,
		request: SetStatusRequest,
	) -> Result<Order, OrderError> {
		let target: OrderStatus = request
			.status
			.parse()
			.map_err(|e: dispatch_types::UnknownOrderStatus| OrderError::Validation(e.to_string()))?;

		let now = self.clock.now();
		let mut before = None;
		let order = self
			.state_machine
			.update_order_with(order_id, |order| {
				if target == OrderStatus::Assigned {
					return Err(OrderError::InvalidTransition {
						from: order.order_status,
						to: target,
					});
				}
				OrderStateMachine::ensure_transition(order.order_status, target)?;
				before = Some(order.clone());
				order.order_status = target;
				if target == OrderStatus::Delivered {
					order.actual_delivery_time = Some(now);
				}
				Ok(true)
			})
			.await?;

		if target == OrderStatus::Delivered {
			if let Some(driver_id) = &order.assigned_driver_id {
				if let Err(e) = self.drivers.release(driver_id).await {
					tracing::error!(
						driver_id = %truncate_id(driver_id),
						error = %e,
						"Failed to release driver, reverting delivery"
					);
					if let Some(previous) = &before {
						match self.state_machine.restore(&order, previous).await {
							Ok(true) => {},
							Ok(false) => tracing::error!("Order changed before delivery could be reverted"),
							Err(restore_err) => tracing::error!(error = %restore_err, "Failed to revert delivery"),
						}
					}
					return Err(OrderError::from_directory(order_id, e));
				}
			}
		}

		tracing::info!(status = %order.order_status, "Order status changed");
		Ok(order)
	}

	/// Claims the named driver, or fails with `NoDriverAvailable`.
	async fn claim_named(&self, order_id: &str, driver_id: &str) -> Result<Driver, OrderError> {
		let driver = self
			.drivers
			.find(driver_id)
			.await
			.map_err(|e| OrderError::from_directory(order_id, e))?
			.ok_or(OrderError::NoDriverAvailable)?;
		self.drivers
			.claim(&driver)
			.await
			.map_err(|e| OrderError::from_directory(order_id, e))?
			.ok_or(OrderError::NoDriverAvailable)
	}

	/// Claims the first available driver in listing order.
	async fn claim_any(&self, order_id: &str) -> Result<Driver, OrderError> {
		let candidates = self
			.drivers
			.list_available()
			.await
			.map_err(|e| OrderError::from_directory(order_id, e))?;
		for candidate in &candidates {
			if let Some(driver) = self
				.drivers
				.claim(candidate)
				.await
				.map_err(|e| OrderError::from_directory(order_id, e))?
			{
				return Ok(driver);
			}
		}
		Err(OrderError::NoDriverAvailable)
	}

	async fn release_or_log(&self, driver_id: &str, reason: &str) {
		if let Err(e) = self.drivers.release(driver_id).await {
			tracing::error!(
				driver_id = %truncate_id(driver_id),
				reason,
				error = %e,
				"Failed to release driver"
			);
		}
	}
}
