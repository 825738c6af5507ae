//! Notification gateway module for the order relay.
//!
//! The relay talks to its messaging platform through two narrow seams:
//! [`NotificationGateway`] for outbound calls (post, edit, acknowledge) and
//! [`EventSource`] for the stream of staff control presses. Implementations
//! live under [`implementations`] and are selected by name from the config.

use async_trait::async_trait;
use orderbot_types::{
	Acknowledgement, ActionEvent, ChatId, ConfigSchema, Controls, EventRef, MessageRef,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

pub mod implementations {
	pub mod memory;
	pub mod telegram;
}

/// Errors that can occur when talking to the messaging platform.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// The platform could not be reached or answered with garbage.
	#[error("Gateway unavailable: {0}")]
	Unavailable(String),
	/// The platform understood the call and refused it.
	#[error("Gateway rejected call: {0}")]
	Rejected(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
	#[error("Event source already running")]
	AlreadyListening,
}

/// Outbound capability of the messaging platform.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Posts a text message, optionally with a row of controls.
	async fn send_text(
		&self,
		chat: ChatId,
		body: &str,
		controls: Option<Controls>,
	) -> Result<MessageRef, GatewayError>;

	/// Posts an image by reference (URL) with a caption.
	async fn send_photo(
		&self,
		chat: ChatId,
		image_ref: &str,
		caption: &str,
		controls: Option<Controls>,
	) -> Result<MessageRef, GatewayError>;

	/// Replaces the controls on a posted message; `None` strips them.
	async fn edit_controls(
		&self,
		message: MessageRef,
		controls: Option<Controls>,
	) -> Result<(), GatewayError>;

	/// Answers an inbound control press.
	async fn acknowledge_event(
		&self,
		event: &EventRef,
		ack: Acknowledgement,
	) -> Result<(), GatewayError>;
}

/// Subscription delivering staff control presses.
#[async_trait]
pub trait EventSource: Send + Sync {
	/// Starts delivering events into `sender` until [`EventSource::stop`].
	async fn start(&self, sender: mpsc::UnboundedSender<ActionEvent>) -> Result<(), GatewayError>;

	async fn stop(&self) -> Result<(), GatewayError>;
}

/// A gateway together with the event source backed by the same account.
#[derive(Clone)]
pub struct GatewayHandles {
	pub gateway: Arc<dyn NotificationGateway>,
	pub events: Arc<dyn EventSource>,
}

/// Signature of the factory function each implementation exposes.
pub type GatewayFactory = fn(&toml::Value) -> Result<GatewayHandles, GatewayError>;

/// All gateway implementations known to the relay, by config name.
pub fn get_all_implementations() -> Vec<(&'static str, GatewayFactory)> {
	use implementations::{memory, telegram};

	vec![
		("telegram", telegram::create_gateway as GatewayFactory),
		("memory", memory::create_gateway as GatewayFactory),
	]
}

/// Best-effort wrapper over a [`NotificationGateway`].
///
/// Failures are logged and swallowed: a notification that could not be
/// delivered never unwinds a transition that has already been applied.
#[derive(Clone)]
pub struct NotificationService {
	gateway: Arc<dyn NotificationGateway>,
}

impl NotificationService {
	pub fn new(gateway: Arc<dyn NotificationGateway>) -> Self {
		Self { gateway }
	}

	/// Direct access for callers that must react to a failed delivery.
	pub fn gateway(&self) -> &Arc<dyn NotificationGateway> {
		&self.gateway
	}

	pub async fn post_text(
		&self,
		chat: ChatId,
		body: &str,
		controls: Option<Controls>,
	) -> Option<MessageRef> {
		match self.gateway.send_text(chat, body, controls).await {
			Ok(message) => Some(message),
			Err(e) => {
				warn!(chat = %chat, error = %e, "Failed to post message");
				None
			},
		}
	}

	pub async fn replace_controls(&self, message: MessageRef, controls: Option<Controls>) {
		if let Err(e) = self.gateway.edit_controls(message, controls).await {
			warn!(
				chat = %message.chat_id,
				message_id = message.message_id,
				error = %e,
				"Failed to edit message controls"
			);
		}
	}

	pub async fn acknowledge(&self, event: &EventRef, ack: Acknowledgement) {
		if let Err(e) = self.gateway.acknowledge_event(event, ack).await {
			warn!(event = %event, error = %e, "Failed to acknowledge action event");
		}
	}
}
