//! Service area reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery time bounds for one serviced zip code.
///
/// All durations are whole minutes measured from the moment an order is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAreaEntry {
	/// Unique identifier for this entry.
	pub id: String,
	/// Postal code covered by this entry.
	pub zip_code: String,
	/// Earliest delivery, in minutes after order creation.
	pub min_delivery_time: u32,
	/// Latest delivery, in minutes after order creation.
	pub max_delivery_time: u32,
	/// Quoted delivery, in minutes after order creation.
	pub expected_delivery_time: u32,
	/// Timestamp when this entry was (re)registered.
	pub created_at: DateTime<Utc>,
}
