//! Service area endpoints.

use super::{from_directory_error, json_body, path_param};
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use dispatch_types::{APIError, CreateServiceAreaRequest, ServiceAreaEntry};

/// Handles POST /zipcodes. Posting a known zip code replaces its bounds.
pub async fn upsert_zipcode(
	State(state): State<AppState>,
	payload: Result<Json<CreateServiceAreaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ServiceAreaEntry>), APIError> {
	let request = json_body(payload)?;
	let entry = state
		.engine
		.service_areas()
		.upsert(request)
		.await
		.map_err(from_directory_error)?;
	Ok((StatusCode::CREATED, Json(entry)))
}

/// Handles GET /zipcodes/{zip_code}.
///
/// An unserviced zip code is not an error: the body is `null`.
pub async fn get_zipcode(
	State(state): State<AppState>,
	zip_code: Result<Path<String>, PathRejection>,
) -> Result<Json<Option<ServiceAreaEntry>>, APIError> {
	let zip_code = path_param(zip_code)?;
	let entry = state
		.engine
		.service_areas()
		.lookup(&zip_code)
		.await
		.map_err(from_directory_error)?;
	Ok(Json(entry))
}
