//! API types for the relay HTTP API.
//!
//! This module defines the request and response bodies of the order
//! submission and lookup endpoints, plus the structured error type that maps
//! onto HTTP status codes.

use crate::{CustomerId, Order, OrderGroup, OrderId, OrderStatus, SubmittedItem};
use axum::{http::StatusCode, response::Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/orders`: one item or a list of items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubmissionPayload {
	Batch(Vec<SubmittedItem>),
	Single(Box<SubmittedItem>),
}

impl SubmissionPayload {
	pub fn into_items(self) -> Vec<SubmittedItem> {
		match self {
			SubmissionPayload::Batch(items) => items,
			SubmissionPayload::Single(item) => vec![*item],
		}
	}
}

/// Outcome of a submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOrdersResponse {
	/// True when every group was announced and no customer was blocked.
	pub success: bool,
	/// Number of orders announced to staff.
	pub sent: usize,
	/// Orders whose announcement could not be delivered.
	pub failed: Vec<OrderId>,
	/// Banned customers whose items were rejected.
	pub blocked: Vec<CustomerId>,
}

/// Response of `GET /api/orders/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
	pub id: OrderId,
	pub status: OrderStatus,
	pub group: OrderGroup,
	pub total: Decimal,
	#[serde(rename = "createdAt")]
	pub created_at: u64,
	#[serde(rename = "updatedAt")]
	pub updated_at: u64,
}

impl From<Order> for OrderView {
	fn from(order: Order) -> Self {
		Self {
			total: order.group.total(),
			id: order.id,
			status: order.status,
			group: order.group,
			created_at: order.created_at,
			updated_at: order.updated_at,
		}
	}
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed or invalid submission (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Unknown resource (404)
	NotFound { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn bad_request(error_type: &str, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type: error_type.to_string(),
			message: message.into(),
			details: None,
		}
	}

	pub fn status_code(&self) -> StatusCode {
		match self {
			APIError::BadRequest { .. } => StatusCode::BAD_REQUEST,
			APIError::NotFound { .. } => StatusCode::NOT_FOUND,
			APIError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
			},
			APIError::NotFound {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		(self.status_code(), Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_payload_accepts_single_item_or_list() {
		let item = r#"{
			"name": "Ana", "phone": "1", "address": "A", "branchName": "B",
			"menuCategory": "C", "menuItem": "D", "quantity": 1, "price": "2.00",
			"telegramId": 7
		}"#;

		let single: SubmissionPayload = serde_json::from_str(item).unwrap();
		assert_eq!(single.into_items().len(), 1);

		let batch: SubmissionPayload =
			serde_json::from_str(&format!("[{item}, {item}]")).unwrap();
		assert_eq!(batch.into_items().len(), 2);
	}

	#[test]
	fn test_response_wire_shape() {
		let response = SubmitOrdersResponse {
			success: false,
			sent: 1,
			failed: vec![OrderId::new("abc")],
			blocked: vec![CustomerId(9)],
		};
		let json = serde_json::to_value(&response).unwrap();
		assert_eq!(
			json,
			serde_json::json!({"success": false, "sent": 1, "failed": ["abc"], "blocked": [9]})
		);
	}

	#[test]
	fn test_error_status_mapping() {
		let err = APIError::bad_request("EMPTY_BATCH", "no items");
		assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(err.to_error_response().error, "EMPTY_BATCH");
		assert_eq!(err.to_string(), "Bad Request: no items");
	}
}
