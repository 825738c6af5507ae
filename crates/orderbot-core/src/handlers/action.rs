//! Staff action handler.
//!
//! Turns control presses into registry transitions and the chat side effects
//! that go with them. Every press is acknowledged exactly once. Whether the
//! press changes anything is decided by the registry, so duplicate or racing
//! presses on one order resolve to a single applied transition.

use crate::ledger::DeclineLedger;
use crate::messages;
use crate::state::{OrderRegistry, RegistryError};
use orderbot_config::ChatsConfig;
use orderbot_notify::NotificationService;
use orderbot_types::{
	truncate_id, Acknowledgement, ActionEvent, ActionKind, Controls, OrderId, StaffAction,
};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Why a press was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
	UnknownAction,
	NotFound,
	AlreadyProcessed,
	NotActive,
}

impl Rejection {
	/// Advisory shown to the staff member who pressed the control.
	pub fn advisory(&self) -> &'static str {
		match self {
			Rejection::UnknownAction => "Unknown action",
			Rejection::NotFound => "Order not found",
			Rejection::AlreadyProcessed => "Order already processed",
			Rejection::NotActive => "Order is not active",
		}
	}
}

impl fmt::Display for Rejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.advisory())
	}
}

impl From<&RegistryError> for Rejection {
	fn from(err: &RegistryError) -> Self {
		match err {
			RegistryError::NotFound(_) => Rejection::NotFound,
			RegistryError::NotActive(_) => Rejection::NotActive,
			RegistryError::AlreadyProcessed(_) | RegistryError::Duplicate(_) => {
				Rejection::AlreadyProcessed
			},
		}
	}
}

/// Result of handling one action event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
	Applied(ActionKind),
	Rejected(Rejection),
}

pub struct ActionHandler {
	registry: Arc<OrderRegistry>,
	ledger: Arc<DeclineLedger>,
	notifier: NotificationService,
	chats: ChatsConfig,
}

impl ActionHandler {
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

	/// Handles one control press.
	pub async fn handle(&self, event: ActionEvent) -> TransitionOutcome {
		match event.data.parse::<StaffAction>() {
			Ok(action) => self.apply(action, &event).await,
			Err(e) => {
				warn!(data = %event.data, error = %e, "Ignoring malformed action token");
				self.notifier
					.acknowledge(
						&event.event_ref,
						Acknowledgement::alert(Rejection::UnknownAction.advisory()),
					)
					.await;
				TransitionOutcome::Rejected(Rejection::UnknownAction)
			},
		}
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(action.order_id.as_str()), action = %action.kind))]
	async fn apply(&self, action: StaffAction, event: &ActionEvent) -> TransitionOutcome {
		let order_id = &action.order_id;
		let result = match action.kind {
			ActionKind::Confirm => self.confirm(order_id, event).await,
			ActionKind::Decline => self.decline(order_id, event).await,
			ActionKind::Prepare => self.prepare(order_id, event).await,
			ActionKind::Deliver => self.deliver(order_id, event).await,
			ActionKind::Complete => self.complete(order_id, event).await,
		};

		match result {
			Ok(()) => {
				info!(actor = event.actor_name(), "Action applied");
				TransitionOutcome::Applied(action.kind)
			},
			Err(e) => {
				let rejection = Rejection::from(&e);
				warn!(actor = event.actor_name(), reason = %rejection, "Action rejected");
				self.notifier
					.acknowledge(&event.event_ref, Acknowledgement::alert(rejection.advisory()))
					.await;
				TransitionOutcome::Rejected(rejection)
			},
		}
	}

	async fn confirm(&self, order_id: &OrderId, event: &ActionEvent) -> Result<(), RegistryError> {
		let group = self.registry.activate(order_id).await?;

		self.notifier
			.acknowledge(&event.event_ref, Acknowledgement::notice("Order confirmed!"))
			.await;
		self.swap_controls(event, None).await;
		self.notifier
			.post_text(
				self.chats.workers_chat_id,
				&messages::prep_brief(&group),
				Some(Controls::start_preparing(order_id)),
			)
			.await;
		Ok(())
	}

	async fn decline(&self, order_id: &OrderId, event: &ActionEvent) -> Result<(), RegistryError> {
		let group = self.registry.decline(order_id).await?;

		self.notifier
			.acknowledge(&event.event_ref, Acknowledgement::notice("Order declined!"))
			.await;
		self.swap_controls(event, None).await;

		let record = self.ledger.record_decline(group.customer_id).await;
		info!(
			customer = %group.customer_id,
			declines = record.count,
			banned = record.banned,
			"Decline recorded"
		);
		Ok(())
	}

	async fn prepare(&self, order_id: &OrderId, event: &ActionEvent) -> Result<(), RegistryError> {
		self.registry.require_active(order_id).await?;

		self.notifier
			.acknowledge(&event.event_ref, Acknowledgement::notice("Marked as preparing"))
			.await;
		self.notifier
			.post_text(
				self.chats.main_chat_id,
				&messages::preparing(order_id, event.actor_name()),
				None,
			)
			.await;
		self.swap_controls(event, Some(Controls::start_delivering(order_id)))
			.await;
		Ok(())
	}

	async fn deliver(&self, order_id: &OrderId, event: &ActionEvent) -> Result<(), RegistryError> {
		self.registry.require_active(order_id).await?;

		self.notifier
			.acknowledge(&event.event_ref, Acknowledgement::notice("Marked as delivering"))
			.await;
		self.notifier
			.post_text(
				self.chats.main_chat_id,
				&messages::delivering(order_id, event.actor_name()),
				None,
			)
			.await;
		self.swap_controls(event, Some(Controls::finish(order_id)))
			.await;
		Ok(())
	}

	async fn complete(&self, order_id: &OrderId, event: &ActionEvent) -> Result<(), RegistryError> {
		// the transition gates the broadcast so a double press announces once
		self.registry.complete(order_id).await?;

		self.notifier
			.acknowledge(&event.event_ref, Acknowledgement::notice("Order completed"))
			.await;
		self.notifier
			.post_text(
				self.chats.main_chat_id,
				&messages::completed(order_id, event.actor_name()),
				None,
			)
			.await;
		self.swap_controls(event, None).await;
		Ok(())
	}

	/// Replaces the controls on the pressed message, if the event names one.
	async fn swap_controls(&self, event: &ActionEvent, controls: Option<Controls>) {
		if let Some(message) = event.message {
			self.notifier.replace_controls(message, controls).await;
		}
	}
}
