//! Order submission handler.
//!
//! Validates a submitted batch, drops items of banned customers, groups the
//! rest and announces each group to the main chat with review controls. An
//! order is only kept in the registry once its announcement was delivered.

use crate::grouping::screen_batch;
use crate::ledger::DeclineLedger;
use crate::messages;
use crate::state::OrderRegistry;
use orderbot_config::ChatsConfig;
use orderbot_notify::NotificationService;
use orderbot_types::{
	truncate_id, Controls, OrderGroup, OrderId, SubmitOrdersResponse, SubmittedItem,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Errors that reject a whole submission before anything is announced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
	#[error("Submission contains no items")]
	EmptyBatch,
	#[error("Item {index} is invalid: {reason}")]
	InvalidItem { index: usize, reason: String },
	#[error("Registry error: {0}")]
	Registry(String),
}

pub struct SubmissionHandler {
	registry: Arc<OrderRegistry>,
	ledger: Arc<DeclineLedger>,
	notifier: NotificationService,
	chats: ChatsConfig,
}

impl SubmissionHandler {
	pub fn new(
		registry: Arc<OrderRegistry>,
		ledger: Arc<DeclineLedger>,
		notifier: NotificationService,
		chats: ChatsConfig,
	) -> Self {
		Self {
			registry,
			ledger,
			notifier,
			chats,
		}
	}

	/// Processes one submitted batch.
	pub async fn handle(
		&self,
		items: Vec<SubmittedItem>,
	) -> Result<SubmitOrdersResponse, SubmissionError> {
		validate_batch(&items)?;

		let screened = screen_batch(&items, &self.ledger).await;
		for customer in &screened.blocked {
			warn!(customer = %customer, "Rejected items from banned customer");
		}

		let mut response = SubmitOrdersResponse {
			blocked: screened.blocked,
			..Default::default()
		};

		for group in screened.groups {
			let order_id = OrderId::new(uuid::Uuid::new_v4().simple().to_string());
			let body = messages::announcement(&order_id, &group);
			self.registry
				.create(order_id.clone(), group.clone())
				.await
				.map_err(|e| SubmissionError::Registry(e.to_string()))?;

			if self.announce(&order_id, &group, &body).await {
				response.sent += 1;
			} else {
				self.registry.discard(&order_id).await;
				response.failed.push(order_id);
			}
		}

		response.success = response.failed.is_empty() && response.blocked.is_empty();
		info!(
			sent = response.sent,
			failed = response.failed.len(),
			blocked = response.blocked.len(),
			"Submission processed"
		);
		Ok(response)
	}

	/// Posts the order to the main chat. Returns whether it was delivered.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id.as_str())))]
	async fn announce(&self, order_id: &OrderId, group: &OrderGroup, body: &str) -> bool {
		let controls = Some(Controls::review(order_id));
		let gateway = self.notifier.gateway();

		let result = match &group.proof_of_payment {
			Some(image_ref) => {
				gateway
					.send_photo(self.chats.main_chat_id, image_ref, body, controls)
					.await
			},
			None => {
				gateway
					.send_text(self.chats.main_chat_id, body, controls)
					.await
			},
		};

		match result {
			Ok(_) => {
				info!(
					customer = %group.customer_id,
					items = group.items.len(),
					"Order announced"
				);
				true
			},
			Err(e) => {
				warn!(error = %e, "Failed to announce order");
				false
			},
		}
	}
}

fn validate_batch(items: &[SubmittedItem]) -> Result<(), SubmissionError> {
	if items.is_empty() {
		return Err(SubmissionError::EmptyBatch);
	}

	// Prices are non-negative, so this bounds every group total too
	let mut batch_total = Decimal::ZERO;
	for (index, item) in items.iter().enumerate() {
		let invalid = |reason: &str| SubmissionError::InvalidItem {
			index,
			reason: reason.to_string(),
		};

		let required = [
			("name", &item.name),
			("phone", &item.phone),
			("address", &item.address),
			("branchName", &item.branch),
			("menuItem", &item.item_name),
		];
		for (field, value) in required {
			if value.trim().is_empty() {
				return Err(invalid(&format!("{} must not be empty", field)));
			}
		}
		if item.quantity == 0 {
			return Err(invalid("quantity must be at least 1"));
		}
		if item.unit_price < Decimal::ZERO {
			return Err(invalid("price must not be negative"));
		}
		batch_total = item
			.line_item()
			.checked_subtotal()
			.and_then(|subtotal| batch_total.checked_add(subtotal))
			.ok_or_else(|| invalid("amount is too large"))?;
	}

	Ok(())
}
