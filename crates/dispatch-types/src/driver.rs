//! Driver records and availability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary availability flag of a driver.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverAvailability {
	/// The driver can take an order.
	#[default]
	Available,
	/// The driver is carrying an order.
	Busy,
}

impl fmt::Display for DriverAvailability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DriverAvailability::Available => write!(f, "available"),
			DriverAvailability::Busy => write!(f, "busy"),
		}
	}
}

/// A delivery driver.
///
/// Availability only changes when the lifecycle engine claims the driver for
/// an order or releases it after delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
	/// Unique identifier for this driver.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Contact phone number.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	/// Contact email address.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Free-form vehicle description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vehicle: Option<String>,
	/// Whether the driver can currently be assigned.
	#[serde(default)]
	pub availability_status: DriverAvailability,
	/// Timestamp when this driver was registered.
	pub created_at: DateTime<Utc>,
	/// Timestamp of the last availability change.
	pub updated_at: DateTime<Utc>,
}

impl Driver {
	/// Returns true when the driver can be claimed for an order.
	pub fn is_available(&self) -> bool {
		self.availability_status == DriverAvailability::Available
	}
}
