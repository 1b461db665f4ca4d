//! HTTP handlers of the dispatch API, one module per resource.
//!
//! Handlers take the path, JSON body and query string as a `Result` so a
//! malformed request becomes a 400 with the usual `{"error": ...}` envelope
//! instead of the framework's plain-text rejection.

pub mod business;
pub mod driver;
pub mod order;
pub mod zipcode;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query};
use dispatch_core::{DirectoryError, OrderError};
use dispatch_types::APIError;

/// Unwraps a JSON body or turns the rejection into a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, APIError> {
	payload
		.map(|Json(value)| value)
		.map_err(|rejection| APIError::BadRequest(rejection.body_text()))
}

/// Unwraps a query string or turns the rejection into a 400.
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, APIError> {
	query
		.map(|Query(value)| value)
		.map_err(|rejection| APIError::BadRequest(rejection.body_text()))
}

/// Unwraps a path parameter or turns the rejection into a 400.
pub(crate) fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, APIError> {
	path
		.map(|Path(value)| value)
		.map_err(|rejection| APIError::BadRequest(rejection.body_text()))
}

/// Maps a lifecycle error onto its HTTP status.
pub(crate) fn from_order_error(err: OrderError) -> APIError {
	match err {
		OrderError::Validation(_)
		| OrderError::UnservicedZip(_)
		| OrderError::OrderLocked
		| OrderError::AssignmentConflict
		| OrderError::NoDriverAvailable
		| OrderError::InvalidTransition { .. } => APIError::BadRequest(err.to_string()),
		OrderError::NotFound(_) => APIError::NotFound(err.to_string()),
		OrderError::ConcurrentModification(_) => APIError::Conflict(err.to_string()),
		OrderError::Storage(_) => {
			tracing::error!(error = %err, "Order operation failed");
			APIError::InternalServerError(err.to_string())
		},
	}
}

/// Maps a directory error onto its HTTP status.
pub(crate) fn from_directory_error(err: DirectoryError) -> APIError {
	match err {
		DirectoryError::Validation(_) => APIError::BadRequest(err.to_string()),
		DirectoryError::NotFound(_) => APIError::NotFound(err.to_string()),
		DirectoryError::Conflict(_) => APIError::Conflict(err.to_string()),
		DirectoryError::Storage(_) => {
			tracing::error!(error = %err, "Directory operation failed");
			APIError::InternalServerError(err.to_string())
		},
	}
}
