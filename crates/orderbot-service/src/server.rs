//! HTTP server for the relay API.
//!
//! Exposes order submission and lookup under `/api` plus a liveness probe.

use axum::{
	extract::{rejection::JsonRejection, DefaultBodyLimit, Path, State},
	http::StatusCode,
	response::Json,
	routing::{get, post},
	Router,
};
use orderbot_config::ApiConfig;
use orderbot_core::OrderEngine;
use orderbot_types::{APIError, OrderView, SubmissionPayload, SubmitOrdersResponse};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<OrderEngine>,
}

/// Builds the API router.
pub fn router(engine: Arc<OrderEngine>, max_request_size: usize) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(handle_submit_orders))
				.route("/orders/{id}", get(handle_get_order_by_id)),
		)
		.route("/health", get(handle_health))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(max_request_size)),
		)
		.with_state(AppState { engine })
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<OrderEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, api_config.max_request_size);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Relay API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/orders requests.
async fn handle_submit_orders(
	State(state): State<AppState>,
	payload: Result<Json<SubmissionPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitOrdersResponse>), APIError> {
	let Json(payload) = payload.map_err(|rejection| {
		tracing::warn!("Rejected malformed submission: {}", rejection.body_text());
		APIError::bad_request("INVALID_REQUEST", rejection.body_text())
	})?;

	match crate::apis::order::submit_orders(payload, &state.engine).await {
		Ok((status, response)) => Ok((status, Json(response))),
		Err(e) => {
			tracing::warn!("Order submission failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles GET /api/orders/{id} requests.
async fn handle_get_order_by_id(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<OrderView>, APIError> {
	match crate::apis::order::get_order_by_id(&id, &state.engine).await {
		Ok(view) => Ok(Json(view)),
		Err(e) => {
			tracing::warn!("Order retrieval failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

async fn handle_health() -> Json<Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::Request;
	use orderbot_config::Config;
	use orderbot_core::DeclineLedger;
	use orderbot_notify::implementations::memory::{MemoryGateway, RecordedCall};
	use orderbot_notify::GatewayHandles;
	use orderbot_storage::implementations::memory::MemoryStorage;
	use orderbot_storage::StorageService;
	use orderbot_types::{ChatId, CustomerId, OrderStatus};
	use tower::ServiceExt;

	const CONFIG: &str = r#"
[service]
id = "api-test"

[chats]
main_chat_id = -100
workers_chat_id = -200

[ledger]
decline_threshold = 1

[storage]
primary = "memory"
[storage.implementations.memory]

[gateway]
primary = "memory"
[gateway.implementations.memory]
"#;

	async fn setup() -> (Router, Arc<OrderEngine>, Arc<MemoryGateway>) {
		let config: Config = CONFIG.parse().unwrap();
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let ledger = Arc::new(DeclineLedger::load(storage, 1).await);
		let gateway = Arc::new(MemoryGateway::new());
		let engine = Arc::new(OrderEngine::new(
			config,
			ledger,
			GatewayHandles {
				gateway: gateway.clone(),
				events: gateway.clone(),
			},
		));
		(router(engine.clone(), 64 * 1024), engine, gateway)
	}

	fn item(name: &str, customer: i64) -> Value {
		serde_json::json!({
			"name": name,
			"phone": "555-0100",
			"address": "1 Main St",
			"branchName": "Central",
			"note": "",
			"menuCategory": "Pizza",
			"menuItem": "Margherita",
			"quantity": 2,
			"price": 9.5,
			"telegramId": customer
		})
	}

	async fn post_orders(app: Router, body: String) -> (StatusCode, Value) {
		let response = app
			.oneshot(
				Request::builder()
					.method("POST")
					.uri("/api/orders")
					.header("content-type", "application/json")
					.body(Body::from(body))
					.unwrap(),
			)
			.await
			.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&bytes).unwrap())
	}

	async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
		let response = app
			.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&bytes).unwrap())
	}

	#[tokio::test]
	async fn test_health() {
		let (app, _, _) = setup().await;
		let (status, body) = get(app, "/health").await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, serde_json::json!({"status": "ok"}));
	}

	#[tokio::test]
	async fn test_submit_single_item() {
		let (app, _, gateway) = setup().await;
		let (status, body) = post_orders(app, item("Ana", 1).to_string()).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(
			body,
			serde_json::json!({"success": true, "sent": 1, "failed": [], "blocked": []})
		);
		let posted = gateway.posted_in(ChatId(-100)).await;
		assert_eq!(posted.len(), 1);
		assert!(posted[0].contains("• Margherita x2 = 19$"));
	}

	#[tokio::test]
	async fn test_submit_batch_groups_customers() {
		let (app, _, gateway) = setup().await;
		let batch = Value::Array(vec![item("Ana", 1), item("Ben", 2), item("Ana", 1)]);
		let (status, body) = post_orders(app, batch.to_string()).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["sent"], 2);
		assert_eq!(gateway.posted_in(ChatId(-100)).await.len(), 2);
	}

	#[tokio::test]
	async fn test_blocked_customer() {
		let (app, engine, _) = setup().await;
		engine.ledger().record_decline(CustomerId(2)).await;

		let (status, body) = post_orders(app.clone(), item("Ben", 2).to_string()).await;
		assert_eq!(status, StatusCode::FORBIDDEN);
		assert_eq!(
			body,
			serde_json::json!({"success": false, "sent": 0, "failed": [], "blocked": [2]})
		);

		let batch = Value::Array(vec![item("Ben", 2), item("Ana", 1)]);
		let (status, body) = post_orders(app, batch.to_string()).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["sent"], 1);
		assert_eq!(body["blocked"], serde_json::json!([2]));
		assert_eq!(body["success"], false);
	}

	#[tokio::test]
	async fn test_invalid_submissions() {
		let (app, _, gateway) = setup().await;

		let (status, body) = post_orders(app.clone(), "[]".to_string()).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "EMPTY_BATCH");

		let mut zero = item("Ana", 1);
		zero["quantity"] = serde_json::json!(0);
		let (status, body) = post_orders(app.clone(), zero.to_string()).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_ITEM");
		assert_eq!(body["details"]["index"], 0);

		let mut huge = item("Ana", 1);
		huge["quantity"] = serde_json::json!(10);
		huge["price"] = serde_json::json!(1e28);
		let (status, body) = post_orders(app.clone(), huge.to_string()).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_ITEM");

		let (status, body) = post_orders(app,"{\"name\": \"Ana\"}".to_string()).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_REQUEST");

		assert!(gateway.calls().await.is_empty());
	}

	#[tokio::test]
	async fn test_get_order() {
		let (app, engine, gateway) = setup().await;
		post_orders(app.clone(), item("Ana", 1).to_string()).await;

		let token = match &gateway.calls().await[0] {
			RecordedCall::Text { controls, .. } => controls.as_ref().unwrap().buttons[0].token.clone(),
			other => panic!("unexpected call {:?}", other),
		};
		let id = token.trim_start_matches("confirm:").to_string();

		let (status, body) = get(app.clone(), &format!("/api/orders/{}", id)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["id"], id.as_str());
		assert_eq!(body["status"], "pending");
		let total: rust_decimal::Decimal = body["total"].as_str().unwrap().parse().unwrap();
		assert_eq!(total, rust_decimal::Decimal::from(19));
		assert_eq!(
			engine.order(&id.as_str().into()).await.unwrap().status,
			OrderStatus::Pending
		);

		let (status, body) = get(app, "/api/orders/missing").await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "ORDER_NOT_FOUND");
	}
}
