//! HTTP server for the dispatch API.
//!
//! Routes map one-to-one onto engine operations. Errors are returned as
//! `{"error": "<message>"}` with the status chosen in [`crate::apis`].

use crate::apis;
use axum::{
	extract::DefaultBodyLimit,
	routing::{get, patch, post},
	Router,
};
use dispatch_config::ApiConfig;
use dispatch_core::DispatchEngine;
use dispatch_types::APIError;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the dispatch engine for processing requests.
	pub engine: Arc<DispatchEngine>,
}

/// Builds the router with every API route.
///
/// Paths no route matches are served from `api.static_dir` when it is set,
/// and answered with a 404 envelope otherwise.
pub fn build_router(api_config: &ApiConfig, engine: Arc<DispatchEngine>) -> Router {
	let app_state = AppState { engine };

	let router = Router::new()
		.route(
			"/businesses",
			post(apis::business::create_business).get(apis::business::list_businesses),
		)
		.route("/businesses/{id}", get(apis::business::get_business))
		.route(
			"/drivers",
			post(apis::driver::create_driver).get(apis::driver::list_drivers),
		)
		.route("/drivers/{id}", get(apis::driver::get_driver))
		.route("/zipcodes", post(apis::zipcode::upsert_zipcode))
		.route("/zipcodes/{zip_code}", get(apis::zipcode::get_zipcode))
		.route(
			"/orders",
			post(apis::order::create_order).get(apis::order::list_orders),
		)
		.route(
			"/orders/{id}",
			get(apis::order::get_order)
				.patch(apis::order::update_order)
				.delete(apis::order::cancel_order),
		)
		.route("/orders/{id}/assign", post(apis::order::assign_driver))
		.route("/orders/{id}/status", patch(apis::order::set_status));

	let router = match &api_config.static_dir {
		Some(dir) => {
			tracing::info!("Serving static files from {}", dir);
			router.fallback_service(ServeDir::new(dir))
		},
		None => router.fallback(|| async { APIError::NotFound("Route not found".into()) }),
	};

	router
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(app_state)
}

/// Starts the HTTP server and runs it until Ctrl-C.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<DispatchEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(&api_config, engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Dispatch API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for shutdown signal: {}", e);
		std::future::pending::<()>().await;
	}
	tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::Body;
	use axum::http::{Request, StatusCode};
	use chrono::{TimeZone, Utc};
	use dispatch_config::ConfigBuilder;
	use dispatch_core::{DispatchBuilder, FixedClock};
	use serde_json::{json, Value};
	use tower::ServiceExt;

	fn api_config(static_dir: Option<String>) -> ApiConfig {
		ApiConfig {
			enabled: true,
			host: "127.0.0.1".into(),
			port: 0,
			max_request_size: 64 * 1024,
			static_dir,
		}
	}

	fn app_with(static_dir: Option<String>) -> Router {
		let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
		let engine = DispatchBuilder::new(ConfigBuilder::new().build())
			.with_clock(Arc::new(clock))
			.build(crate::engine_factories())
			.unwrap();
		build_router(&api_config(static_dir), Arc::new(engine))
	}

	fn app() -> Router {
		app_with(None)
	}

	async fn send_raw(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
		let builder = Request::builder().method(method).uri(uri);
		let request = match body {
			Some(body) => builder
				.header("content-type", "application/json")
				.body(Body::from(body))
				.unwrap(),
			None => builder.body(Body::empty()).unwrap(),
		};
		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
		send_raw(app, method, uri, body.map(|b| b.to_string())).await
	}

	/// Registers zip 10001 and one business, returns the business id.
	async fn seed(app: &Router) -> String {
		let (status, _) = send(
			app,
			"POST",
			"/zipcodes",
			Some(json!({
				"zipCode": "10001",
				"minDeliveryTime": 30,
				"maxDeliveryTime": 60,
				"expectedDeliveryTime": 45
			})),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED);

		let (status, business) = send(
			app,
			"POST",
			"/businesses",
			Some(json!({ "name": "Corner Deli", "email": "owner@corner-deli.test" })),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED);
		business["id"].as_str().unwrap().to_string()
	}

	fn order_body(business_id: &str, zip: &str) -> Value {
		json!({
			"businessId": business_id,
			"customerName": "Dana",
			"deliveryAddress": "12 Elm St",
			"customerZipCode": zip,
			"orderItems": "2 bagels"
		})
	}

	#[tokio::test]
	async fn test_order_lifecycle_over_http() {
		let app = app();
		let business_id = seed(&app).await;
		let (_, driver) = send(&app, "POST", "/drivers", Some(json!({ "name": "Ana" }))).await;
		let driver_id = driver["id"].as_str().unwrap().to_string();
		assert_eq!(driver["availabilityStatus"], "available");

		let (status, order) =
			send(&app, "POST", "/orders", Some(order_body(&business_id, "10001"))).await;
		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(order["orderStatus"], "received");
		assert_eq!(order["minDeliveryTime"], "2024-03-01T12:30:00Z");
		assert_eq!(order["expectedDeliveryTime"], "2024-03-01T12:45:00Z");
		assert_eq!(order["maxDeliveryTime"], "2024-03-01T13:00:00Z");
		let order_id = order["id"].as_str().unwrap().to_string();
		let order_uri = format!("/orders/{}", order_id);

		let (status, assigned) = send(
			&app,
			"POST",
			&format!("{}/assign", order_uri),
			Some(json!({ "autoAssign": true })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(assigned["orderStatus"], "assigned");
		assert_eq!(assigned["assignedDriverId"], driver_id.as_str());

		let (status, view) = send(&app, "GET", &order_uri, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(view["business"]["name"], "Corner Deli");
		assert_eq!(view["driver"]["availabilityStatus"], "busy");

		let (status, _) = send(
			&app,
			"PATCH",
			&format!("{}/status", order_uri),
			Some(json!({ "status": "picked_up" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);

		let (status, body) = send(
			&app,
			"PATCH",
			&order_uri,
			Some(json!({ "deliveryAddress": "14 Elm St" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "error": "Cannot update after pickup" }));

		let (status, delivered) = send(
			&app,
			"PATCH",
			&format!("{}/status", order_uri),
			Some(json!({ "status": "delivered" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(delivered["orderStatus"], "delivered");
		assert!(delivered["actualDeliveryTime"].is_string());

		let (_, driver) = send(&app, "GET", &format!("/drivers/{}", driver_id), None).await;
		assert_eq!(driver["availabilityStatus"], "available");

		let (status, list) = send(
			&app,
			"GET",
			&format!("/orders?driverId={}", driver_id),
			None,
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(list.as_array().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_unserviced_zip() {
		let app = app();
		let business_id = seed(&app).await;
		let (status, body) =
			send(&app, "POST", "/orders", Some(order_body(&business_id, "99999"))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "error": "Zip code not serviced" }));

		let (_, list) = send(&app, "GET", "/orders", None).await;
		assert_eq!(list, json!([]));
	}

	#[tokio::test]
	async fn test_missing_records() {
		let app = app();
		let (status, body) = send(&app, "GET", "/orders/nope", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body, json!({ "error": "Order not found" }));

		let (status, body) = send(&app, "GET", "/drivers/nope", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body, json!({ "error": "Driver not found" }));

		let (status, body) = send(&app, "GET", "/businesses/nope", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body, json!({ "error": "Business not found" }));

		let (status, body) = send(&app, "GET", "/zipcodes/99999", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, Value::Null);
	}

	#[tokio::test]
	async fn test_cancel_assigned_order_rejected() {
		let app = app();
		let business_id = seed(&app).await;
		send(&app, "POST", "/drivers", Some(json!({ "name": "Ana" }))).await;
		let (_, order) = send(&app, "POST", "/orders", Some(order_body(&business_id, "10001"))).await;
		let order_uri = format!("/orders/{}", order["id"].as_str().unwrap());

		send(
			&app,
			"POST",
			&format!("{}/assign", order_uri),
			Some(json!({ "autoAssign": true })),
		)
		.await;
		let (status, body) = send(&app, "DELETE", &order_uri, None).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "error": "Cannot cancel assigned order" }));
	}

	#[tokio::test]
	async fn test_cancel_and_no_driver() {
		let app = app();
		let business_id = seed(&app).await;
		let (_, order) = send(&app, "POST", "/orders", Some(order_body(&business_id, "10001"))).await;
		let order_uri = format!("/orders/{}", order["id"].as_str().unwrap());

		let (status, body) = send(
			&app,
			"POST",
			&format!("{}/assign", order_uri),
			Some(json!({ "autoAssign": true })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "error": "No driver available" }));

		let (status, cancelled) = send(&app, "DELETE", &order_uri, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(cancelled["orderStatus"], "cancelled");
	}

	#[tokio::test]
	async fn test_bad_payloads_use_error_envelope() {
		let app = app();
		let business_id = seed(&app).await;

		let (status, body) = send_raw(&app, "POST", "/orders", Some("{not json".into())).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(body["error"].is_string());

		let (status, body) = send(&app, "POST", "/businesses", Some(json!({ "name": "" }))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "error": "name is required" }));

		let (_, order) = send(&app, "POST", "/orders", Some(order_body(&business_id, "10001"))).await;
		let (status, body) = send(
			&app,
			"PATCH",
			&format!("/orders/{}/status", order["id"].as_str().unwrap()),
			Some(json!({ "status": "lost" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body, json!({ "error": "Unknown order status: lost" }));
	}

	#[tokio::test]
	async fn test_undecodable_path_uses_error_envelope() {
		let app = app();
		for uri in ["/orders/%FF", "/drivers/%FF", "/businesses/%FF", "/zipcodes/%FF"] {
			let (status, body) = send(&app, "GET", uri, None).await;
			assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
			assert!(body["error"].is_string(), "{}", uri);
		}

		let (status, body) = send(
			&app,
			"PATCH",
			"/orders/%FF/status",
			Some(json!({ "status": "delivered" })),
		)
		.await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(body["error"].is_string());
	}

	#[tokio::test]
	async fn test_unknown_route_without_static_dir() {
		let (status, body) = send(&app(), "GET", "/nowhere", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body, json!({ "error": "Route not found" }));
	}

	#[tokio::test]
	async fn test_static_files_served_as_fallback() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("index.html"), "<h1>dispatch</h1>").unwrap();
		let app = app_with(Some(dir.path().to_string_lossy().into_owned()));

		let request = Request::builder()
			.uri("/index.html")
			.body(Body::empty())
			.unwrap();
		let response = app.clone().oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		assert_eq!(&bytes[..], b"<h1>dispatch</h1>");

		// API routes still win
		let (status, _) = send(&app, "GET", "/drivers", None).await;
		assert_eq!(status, StatusCode::OK);
	}
}
