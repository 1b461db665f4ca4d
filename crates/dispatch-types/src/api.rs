//! API types for the dispatch HTTP API.
//!
//! This module defines the request payloads accepted by the HTTP endpoints,
//! the error envelope returned on failure and the status mapping of API errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Request body for `POST /businesses`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessRequest {
	#[validate(length(min = 1, message = "name is required"))]
	pub name: String,
	#[validate(email(message = "email must be a valid address"))]
	pub email: Option<String>,
	pub phone: Option<String>,
	pub address: Option<String>,
}

/// Request body for `POST /drivers`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriverRequest {
	#[validate(length(min = 1, message = "name is required"))]
	pub name: String,
	pub phone: Option<String>,
	#[validate(email(message = "email must be a valid address"))]
	pub email: Option<String>,
	pub vehicle: Option<String>,
}

/// Request body for `POST /zipcodes`.
///
/// All delivery times are whole minutes after order creation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_delivery_bounds"))]
pub struct CreateServiceAreaRequest {
	#[validate(length(min = 1, message = "zipCode is required"))]
	pub zip_code: String,
	pub min_delivery_time: u32,
	pub max_delivery_time: u32,
	pub expected_delivery_time: u32,
}

fn validate_delivery_bounds(
	request: &CreateServiceAreaRequest,
) -> Result<(), validator::ValidationError> {
	let ordered = request.min_delivery_time <= request.expected_delivery_time
		&& request.expected_delivery_time <= request.max_delivery_time;
	if ordered {
		Ok(())
	} else {
		let mut error = validator::ValidationError::new("delivery_bounds");
		error.message = Some(
			"delivery times must satisfy minDeliveryTime <= expectedDeliveryTime <= maxDeliveryTime"
				.into(),
		);
		Err(error)
	}
}

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
	#[validate(length(min = 1, message = "businessId is required"))]
	pub business_id: String,
	#[validate(length(min = 1, message = "customerName is required"))]
	pub customer_name: String,
	pub customer_phone: Option<String>,
	#[validate(length(min = 1, message = "deliveryAddress is required"))]
	pub delivery_address: String,
	#[validate(length(min = 1, message = "customerZipCode is required"))]
	pub customer_zip_code: String,
	#[validate(length(min = 1, message = "orderItems is required"))]
	pub order_items: String,
}

/// Request body for `PATCH /orders/{id}`.
///
/// Only destination and item fields can change; status, driver and the zip
/// code that fixed the delivery window are not part of this payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOrderRequest {
	#[validate(length(min = 1, message = "customerName cannot be empty"))]
	pub customer_name: Option<String>,
	pub customer_phone: Option<String>,
	#[validate(length(min = 1, message = "deliveryAddress cannot be empty"))]
	pub delivery_address: Option<String>,
	#[validate(length(min = 1, message = "orderItems cannot be empty"))]
	pub order_items: Option<String>,
}

/// Request body for `POST /orders/{id}/assign`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverRequest {
	/// Pick any available driver instead of `driver_id`.
	#[serde(default)]
	pub auto_assign: bool,
	/// Driver to assign when `auto_assign` is false.
	pub driver_id: Option<String>,
}

/// Request body for `PATCH /orders/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
	/// Raw status value, validated against the known states.
	pub status: String,
}

/// Query parameters for `GET /orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
	/// Only orders placed by this business.
	pub business_id: Option<String>,
	/// Only orders carried by this driver.
	pub driver_id: Option<String>,
}

/// API error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
	/// Human-readable description of the failure.
	pub error: String,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Invalid input or a rejected lifecycle operation (400)
	BadRequest(String),
	/// Referenced entity does not exist (404)
	NotFound(String),
	/// Lost an optimistic concurrency race (409)
	Conflict(String),
	/// Storage or other internal failure (500)
	InternalServerError(String),
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest(_) => 400,
			APIError::NotFound(_) => 404,
			APIError::Conflict(_) => 409,
			APIError::InternalServerError(_) => 500,
		}
	}

	/// Returns the message carried by this error.
	pub fn message(&self) -> &str {
		match self {
			APIError::BadRequest(message)
			| APIError::NotFound(message)
			| APIError::Conflict(message)
			| APIError::InternalServerError(message) => message,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			error: self.message().to_string(),
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest(message) => write!(f, "Bad Request: {}", message),
			APIError::NotFound(message) => write!(f, "Not Found: {}", message),
			APIError::Conflict(message) => write!(f, "Conflict: {}", message),
			APIError::InternalServerError(message) => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
