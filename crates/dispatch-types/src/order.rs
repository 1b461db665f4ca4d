//! Order processing types for the dispatch system.
//!
//! This module defines the order record, its closed set of status values and
//! the joined view returned by the query endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::{Business, Driver};

/// A delivery order placed by a business.
///
/// The three delivery-window timestamps are computed once at creation from the
/// customer's service area and never recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Business that placed the order (weak reference).
	pub business_id: String,
	/// Name of the receiving customer.
	pub customer_name: String,
	/// Phone number of the receiving customer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_phone: Option<String>,
	/// Street address the order is delivered to.
	pub delivery_address: String,
	/// Zip code of the delivery address.
	pub customer_zip_code: String,
	/// Description of the ordered items.
	pub order_items: String,
	/// Current status of the order.
	#[serde(default)]
	pub order_status: OrderStatus,
	/// Driver carrying the order (weak reference).
	#[serde(default)]
	pub assigned_driver_id: Option<String>,
	/// Earliest promised delivery time.
	pub min_delivery_time: DateTime<Utc>,
	/// Latest promised delivery time.
	pub max_delivery_time: DateTime<Utc>,
	/// Quoted delivery time.
	pub expected_delivery_time: DateTime<Utc>,
	/// Time the order was marked delivered.
	#[serde(default)]
	pub actual_delivery_time: Option<DateTime<Utc>>,
	/// Timestamp when this order was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this order was last updated.
	pub updated_at: DateTime<Utc>,
}

/// Status of an order.
///
/// Orders progress `received -> assigned -> picked_up -> out_for_delivery ->
/// delivered`; `cancelled` is only reachable before a driver is assigned.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order has been accepted and awaits a driver.
	#[default]
	Received,
	/// A driver has been assigned.
	Assigned,
	/// The driver has collected the order.
	PickedUp,
	/// The driver is on the way to the customer.
	OutForDelivery,
	/// The order reached the customer.
	Delivered,
	/// The order was withdrawn before assignment.
	Cancelled,
}

impl OrderStatus {
	/// Returns the wire name of this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Received => "received",
			OrderStatus::Assigned => "assigned",
			OrderStatus::PickedUp => "picked_up",
			OrderStatus::OutForDelivery => "out_for_delivery",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns true while destination and item fields may still change.
	pub fn is_editable(&self) -> bool {
		matches!(self, OrderStatus::Received | OrderStatus::Assigned)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a status string names no known status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
	type Err = UnknownOrderStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"received" => Ok(Self::Received),
			"assigned" => Ok(Self::Assigned),
			"picked_up" => Ok(Self::PickedUp),
			"out_for_delivery" => Ok(Self::OutForDelivery),
			"delivered" => Ok(Self::Delivered),
			"cancelled" => Ok(Self::Cancelled),
			other => Err(UnknownOrderStatus(other.to_string())),
		}
	}
}

/// Order joined with its referenced business and driver.
///
/// References are resolved when the order is read; a dangling reference
/// resolves to `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
	/// The stored order.
	#[serde(flatten)]
	pub order: Order,
	/// The business referenced by `businessId`.
	pub business: Option<Business>,
	/// The driver referenced by `assignedDriverId`.
	pub driver: Option<Driver>,
}
