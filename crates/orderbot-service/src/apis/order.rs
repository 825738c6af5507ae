//! Order submission and lookup endpoints.

use axum::http::StatusCode;
use orderbot_core::{OrderEngine, SubmissionError};
use orderbot_types::{APIError, OrderId, OrderView, SubmissionPayload, SubmitOrdersResponse};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while serving order requests.
#[derive(Debug, Error)]
pub enum OrderApiError {
	#[error("Order not found: {0}")]
	NotFound(OrderId),
	#[error(transparent)]
	Submission(#[from] SubmissionError),
}

impl From<OrderApiError> for APIError {
	fn from(err: OrderApiError) -> Self {
		let message = err.to_string();
		match err {
			OrderApiError::NotFound(_) => APIError::NotFound {
				error_type: "ORDER_NOT_FOUND".to_string(),
				message,
			},
			OrderApiError::Submission(SubmissionError::EmptyBatch) => {
				APIError::bad_request("EMPTY_BATCH", message)
			},
			OrderApiError::Submission(SubmissionError::InvalidItem { index, .. }) => {
				APIError::BadRequest {
					error_type: "INVALID_ITEM".to_string(),
					message,
					details: Some(serde_json::json!({ "index": index })),
				}
			},
			OrderApiError::Submission(SubmissionError::Registry(_)) => {
				APIError::InternalServerError {
					error_type: "INTERNAL_ERROR".to_string(),
					message,
				}
			},
		}
	}
}

/// Announces a submitted batch and picks the response status.
///
/// The status is 403 when every item came from a banned customer, 200
/// otherwise.
pub async fn submit_orders(
	payload: SubmissionPayload,
	engine: &OrderEngine,
) -> Result<(StatusCode, SubmitOrdersResponse), OrderApiError> {
	let items = payload.into_items();
	info!(items = items.len(), "Received order submission");

	let response = engine.submit_orders(items).await?;
	let status = if response.sent == 0 && response.failed.is_empty() && !response.blocked.is_empty()
	{
		StatusCode::FORBIDDEN
	} else {
		StatusCode::OK
	};
	Ok((status, response))
}

pub async fn get_order_by_id(id: &str, engine: &OrderEngine) -> Result<OrderView, OrderApiError> {
	let order_id = OrderId::new(id);
	engine
		.order(&order_id)
		.await
		.map(OrderView::from)
		.map_err(|_| OrderApiError::NotFound(order_id))
}
