//! Order endpoints.
//!
//! Writes go through the lifecycle handler and return the bare order; reads
//! go through the query layer and return the order joined with its business
//! and driver.

use super::{from_order_error, json_body, path_param, query_params};
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use dispatch_types::{
	APIError, AssignDriverRequest, CreateOrderRequest, Order, OrderFilter, OrderView,
	SetStatusRequest, UpdateOrderRequest,
};

/// Handles POST /orders.
pub async fn create_order(
	State(state): State<AppState>,
	payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), APIError> {
	let request = json_body(payload)?;
	let order = state
		.engine
		.orders()
		.create(request)
		.await
		.map_err(from_order_error)?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /orders?businessId=&driverId=.
pub async fn list_orders(
	State(state): State<AppState>,
	query: Result<Query<OrderFilter>, QueryRejection>,
) -> Result<Json<Vec<OrderView>>, APIError> {
	let filter = query_params(query)?;
	let orders = state
		.engine
		.order_query()
		.list(&filter)
		.await
		.map_err(from_order_error)?;
	Ok(Json(orders))
}

/// Handles GET /orders/{id}.
pub async fn get_order(
	State(state): State<AppState>,
	id: Result<Path<String>, PathRejection>,
) -> Result<Json<OrderView>, APIError> {
	let id = path_param(id)?;
	let order = state
		.engine
		.order_query()
		.get(&id)
		.await
		.map_err(from_order_error)?;
	Ok(Json(order))
}

/// Handles PATCH /orders/{id}.
pub async fn update_order(
	State(state): State<AppState>,
	id: Result<Path<String>, PathRejection>,
	payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<Order>, APIError> {
	let id = path_param(id)?;
	let request = json_body(payload)?;
	let order = state
		.engine
		.orders()
		.update(&id, request)
		.await
		.map_err(from_order_error)?;
	Ok(Json(order))
}

/// Handles DELETE /orders/{id}. Orders are cancelled, never removed.
pub async fn cancel_order(
	State(state): State<AppState>,
	id: Result<Path<String>, PathRejection>,
) -> Result<Json<Order>, APIError> {
	let id = path_param(id)?;
	let order = state
		.engine
		.orders()
		.cancel(&id)
		.await
		.map_err(from_order_error)?;
	Ok(Json(order))
}

/// Handles POST /orders/{id}/assign.
pub async fn assign_driver(
	State(state): State<AppState>,
	id: Result<Path<String>, PathRejection>,
	payload: Result<Json<AssignDriverRequest>, JsonRejection>,
) -> Result<Json<Order>, APIError> {
	let id = path_param(id)?;
	let request = json_body(payload)?;
	let order = state
		.engine
		.orders()
		.assign(&id, request)
		.await
		.map_err(from_order_error)?;
	Ok(Json(order))
}

/// Handles PATCH /orders/{id}/status.
pub async fn set_status(
	State(state): State<AppState>,
	id: Result<Path<String>, PathRejection>,
	payload: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, APIError> {
	let id = path_param(id)?;
	let request = json_body(payload)?;
	let order = state
		.engine
		.orders()
		.set_status(&id, request)
		.await
		.map_err(from_order_error)?;
	Ok(Json(order))
}
