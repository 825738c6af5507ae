//! Order registry implementation.
//!
//! Orders move Pending -> Active -> Completed, or Pending -> Declined. Every
//! status check and status change happens under one write lock, so of two
//! racing transitions on the same order exactly one succeeds and the other
//! observes the result.

use orderbot_types::{current_timestamp, Order, OrderGroup, OrderId, OrderStatus};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during order state management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	#[error("Order not found: {0}")]
	NotFound(OrderId),
	/// The order already left the status the action requires.
	#[error("Order already processed: {0}")]
	AlreadyProcessed(OrderId),
	/// The order has not been confirmed yet.
	#[error("Order is not active: {0}")]
	NotActive(OrderId),
	#[error("Order already exists: {0}")]
	Duplicate(OrderId),
}

/// In-memory store of orders keyed by id.
#[derive(Default)]
pub struct OrderRegistry {
	orders: RwLock<HashMap<OrderId, Order>>,
}

impl OrderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a freshly announced order in Pending.
	pub async fn create(&self, order_id: OrderId, group: OrderGroup) -> Result<Order, RegistryError> {
		let mut orders = self.orders.write().await;
		if orders.contains_key(&order_id) {
			return Err(RegistryError::Duplicate(order_id));
		}

		let now = current_timestamp();
		let order = Order {
			id: order_id.clone(),
			status: OrderStatus::Pending,
			group,
			created_at: now,
			updated_at: now,
		};
		orders.insert(order_id, order.clone());
		Ok(order)
	}

	/// Pending -> Active.
	pub async fn activate(&self, order_id: &OrderId) -> Result<OrderGroup, RegistryError> {
		self.transition(order_id, OrderStatus::Active).await
	}

	/// Pending -> Declined.
	pub async fn decline(&self, order_id: &OrderId) -> Result<OrderGroup, RegistryError> {
		self.transition(order_id, OrderStatus::Declined).await
	}

	/// Active -> Completed.
	pub async fn complete(&self, order_id: &OrderId) -> Result<OrderGroup, RegistryError> {
		self.transition(order_id, OrderStatus::Completed).await
	}

	/// Checks that the order is Active without changing it.
	pub async fn require_active(&self, order_id: &OrderId) -> Result<OrderGroup, RegistryError> {
		let orders = self.orders.read().await;
		let order = orders
			.get(order_id)
			.ok_or_else(|| RegistryError::NotFound(order_id.clone()))?;

		match order.status {
			OrderStatus::Active => Ok(order.group.clone()),
			OrderStatus::Pending => Err(RegistryError::NotActive(order_id.clone())),
			OrderStatus::Declined | OrderStatus::Completed => {
				Err(RegistryError::AlreadyProcessed(order_id.clone()))
			},
		}
	}

	pub async fn get(&self, order_id: &OrderId) -> Result<Order, RegistryError> {
		self.orders
			.read()
			.await
			.get(order_id)
			.cloned()
			.ok_or_else(|| RegistryError::NotFound(order_id.clone()))
	}

	/// Removes a Pending order nobody was told about. Returns whether an
	/// order was removed.
	pub async fn discard(&self, order_id: &OrderId) -> bool {
		let mut orders = self.orders.write().await;
		match orders.get(order_id) {
			Some(order) if order.status == OrderStatus::Pending => {
				orders.remove(order_id);
				true
			},
			_ => false,
		}
	}

	/// Drops terminal orders last updated more than `retention` ago.
	pub async fn prune_terminal(&self, retention: Duration) -> usize {
		let cutoff = current_timestamp().saturating_sub(retention.as_secs());
		let mut orders = self.orders.write().await;
		let before = orders.len();
		orders.retain(|_, order| !(order.status.is_terminal() && order.updated_at <= cutoff));
		before - orders.len()
	}

	pub async fn len(&self) -> usize {
		self.orders.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.orders.read().await.is_empty()
	}

	async fn transition(
		&self,
		order_id: &OrderId,
		to: OrderStatus,
	) -> Result<OrderGroup, RegistryError> {
		let mut orders = self.orders.write().await;
		let order = orders
			.get_mut(order_id)
			.ok_or_else(|| RegistryError::NotFound(order_id.clone()))?;

		if !order.status.can_transition_to(to) {
			return Err(match (order.status, to) {
				(OrderStatus::Pending, OrderStatus::Completed) => {
					RegistryError::NotActive(order_id.clone())
				},
				_ => RegistryError::AlreadyProcessed(order_id.clone()),
			});
		}

		order.status = to;
		order.updated_at = current_timestamp();
		Ok(order.group.clone())
	}
}
