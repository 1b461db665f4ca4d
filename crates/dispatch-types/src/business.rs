//! Business reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business that places orders.
///
/// Businesses are immutable once created. Orders refer to them by id only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Business {
	/// Unique identifier for this business.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Contact address used for order notifications.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Contact phone number.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	/// Street address of the business.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	/// Timestamp when this business was registered.
	pub created_at: DateTime<Utc>,
}
