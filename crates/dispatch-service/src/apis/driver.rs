//! Driver endpoints. Availability is not writable here; it follows the
//! orders a driver is assigned to.

use super::{from_directory_error, json_body, path_param};
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use dispatch_types::{APIError, CreateDriverRequest, Driver};

/// Handles POST /drivers.
pub async fn create_driver(
	State(state): State<AppState>,
	payload: Result<Json<CreateDriverRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Driver>), APIError> {
	let request = json_body(payload)?;
	let driver = state
		.engine
		.drivers()
		.create(request)
		.await
		.map_err(from_directory_error)?;
	Ok((StatusCode::CREATED, Json(driver)))
}

/// Handles GET /drivers.
pub async fn list_drivers(State(state): State<AppState>) -> Result<Json<Vec<Driver>>, APIError> {
	let drivers = state
		.engine
		.drivers()
		.list()
		.await
		.map_err(from_directory_error)?;
	Ok(Json(drivers))
}

/// Handles GET /drivers/{id}.
pub async fn get_driver(
	State(state): State<AppState>,
	id: Result<Path<String>, PathRejection>,
) -> Result<Json<Driver>, APIError> {
	let id = path_param(id)?;
	let driver = state
		.engine
		.drivers()
		.get(&id)
		.await
		.map_err(from_directory_error)?;
	Ok(Json(driver))
}
