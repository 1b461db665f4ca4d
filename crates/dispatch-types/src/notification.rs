//! Outbound notification messages.

use serde::{Deserialize, Serialize};

/// A message handed to the notification gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
	/// Recipient address.
	pub to: String,
	/// Subject line.
	pub subject: String,
	/// Plain-text body.
	pub body: String,
}
