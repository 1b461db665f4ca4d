//! Business endpoints.

use super::{from_directory_error, json_body, path_param};
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use dispatch_types::{APIError, Business, CreateBusinessRequest};

/// Handles POST /businesses.
pub async fn create_business(
	State(state): State<AppState>,
	payload: Result<Json<CreateBusinessRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Business>), APIError> {
	let request = json_body(payload)?;
	let business = state
		.engine
		.businesses()
		.create(request)
		.await
		.map_err(from_directory_error)?;
	Ok((StatusCode::CREATED, Json(business)))
}

/// Handles GET /businesses.
pub async fn list_businesses(
	State(state): State<AppState>,
) -> Result<Json<Vec<Business>>, APIError> {
	let businesses = state
		.engine
		.businesses()
		.list()
		.await
		.map_err(from_directory_error)?;
	Ok(Json(businesses))
}

/// Handles GET /businesses/{id}.
pub async fn get_business(
	State(state): State<AppState>,
	id: Result<Path<String>, PathRejection>,
) -> Result<Json<Business>, APIError> {
	let id = path_param(id)?;
	let business = state
		.engine
		.businesses()
		.get(&id)
		.await
		.map_err(from_directory_error)?;
	Ok(Json(business))
}
