//! In-memory gateway used in development and tests.
//!
//! Records every outbound call, hands out sequential message ids and lets
//! callers inject control presses into the event subscription.

use crate::{EventSource, GatewayError, GatewayHandles, NotificationGateway};
use async_trait::async_trait;
use orderbot_types::{
	Acknowledgement, ActionEvent, ChatId, ConfigSchema, Controls, EventRef, MessageRef, Schema,
	ValidationError,
};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// An outbound call observed by [`MemoryGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
	Text {
		message: MessageRef,
		body: String,
		controls: Option<Controls>,
	},
	Photo {
		message: MessageRef,
		image_ref: String,
		caption: String,
		controls: Option<Controls>,
	},
	EditControls {
		message: MessageRef,
		controls: Option<Controls>,
	},
	Acknowledge {
		event: EventRef,
		ack: Acknowledgement,
	},
}

pub struct MemoryGateway {
	calls: Mutex<Vec<RecordedCall>>,
	next_message_id: AtomicI64,
	next_event_id: AtomicI64,
	fail_sends: AtomicBool,
	fail_edits: AtomicBool,
	fail_acknowledgements: AtomicBool,
	subscriber: Mutex<Option<mpsc::UnboundedSender<ActionEvent>>>,
}

impl MemoryGateway {
	pub fn new() -> Self {
		Self {
			calls: Mutex::new(Vec::new()),
			next_message_id: AtomicI64::new(1),
			next_event_id: AtomicI64::new(1),
			fail_sends: AtomicBool::new(false),
			fail_edits: AtomicBool::new(false),
			fail_acknowledgements: AtomicBool::new(false),
			subscriber: Mutex::new(None),
		}
	}

	/// Makes `send_text` and `send_photo` fail with `Unavailable`.
	pub fn fail_sends(&self, fail: bool) {
		self.fail_sends.store(fail, Ordering::SeqCst);
	}

	pub fn fail_edits(&self, fail: bool) {
		self.fail_edits.store(fail, Ordering::SeqCst);
	}

	pub fn fail_acknowledgements(&self, fail: bool) {
		self.fail_acknowledgements.store(fail, Ordering::SeqCst);
	}

	/// Successful outbound calls, oldest first.
	pub async fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().await.clone()
	}

	/// Bodies and captions of every posted message in `chat`.
	pub async fn posted_in(&self, chat: ChatId) -> Vec<String> {
		self.calls
			.lock()
			.await
			.iter()
			.filter_map(|call| match call {
				RecordedCall::Text { message, body, .. } if message.chat_id == chat => {
					Some(body.clone())
				},
				RecordedCall::Photo {
					message, caption, ..
				} if message.chat_id == chat => Some(caption.clone()),
				_ => None,
			})
			.collect()
	}

	/// Acknowledgements sent for `event`.
	pub async fn acknowledgements_for(&self, event: &EventRef) -> Vec<Acknowledgement> {
		self.calls
			.lock()
			.await
			.iter()
			.filter_map(|call| match call {
				RecordedCall::Acknowledge { event: e, ack } if e == event => Some(ack.clone()),
				_ => None,
			})
			.collect()
	}

	pub async fn clear(&self) {
		self.calls.lock().await.clear();
	}

	/// Builds a control press on `message` with a fresh event reference.
	pub fn press(&self, data: &str, actor: Option<&str>, message: Option<MessageRef>) -> ActionEvent {
		let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
		ActionEvent {
			event_ref: EventRef::new(format!("cb-{}", id)),
			actor: actor.map(str::to_string),
			message,
			data: data.to_string(),
		}
	}

	/// Whether an event subscription is currently running.
	pub async fn is_listening(&self) -> bool {
		self.subscriber.lock().await.is_some()
	}

	/// Delivers `event` to the running subscription.
	pub async fn inject(&self, event: ActionEvent) -> Result<(), GatewayError> {
		let subscriber = self.subscriber.lock().await;
		let sender = subscriber
			.as_ref()
			.ok_or_else(|| GatewayError::Unavailable("event source not started".into()))?;
		sender
			.send(event)
			.map_err(|_| GatewayError::Unavailable("event subscriber dropped".into()))
	}

	fn next_message(&self, chat: ChatId) -> MessageRef {
		MessageRef::new(chat, self.next_message_id.fetch_add(1, Ordering::SeqCst))
	}

	async fn record(&self, call: RecordedCall) {
		self.calls.lock().await.push(call);
	}
}

impl Default for MemoryGateway {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl NotificationGateway for MemoryGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryGatewaySchema)
	}

	async fn send_text(
		&self,
		chat: ChatId,
		body: &str,
		controls: Option<Controls>,
	) -> Result<MessageRef, GatewayError> {
		if self.fail_sends.load(Ordering::SeqCst) {
			return Err(GatewayError::Unavailable("send disabled".into()));
		}
		let message = self.next_message(chat);
		self.record(RecordedCall::Text {
			message,
			body: body.to_string(),
			controls,
		})
		.await;
		Ok(message)
	}

	async fn send_photo(
		&self,
		chat: ChatId,
		image_ref: &str,
		caption: &str,
		controls: Option<Controls>,
	) -> Result<MessageRef, GatewayError> {
		if self.fail_sends.load(Ordering::SeqCst) {
			return Err(GatewayError::Unavailable("send disabled".into()));
		}
		let message = self.next_message(chat);
		self.record(RecordedCall::Photo {
			message,
			image_ref: image_ref.to_string(),
			caption: caption.to_string(),
			controls,
		})
		.await;
		Ok(message)
	}

	async fn edit_controls(
		&self,
		message: MessageRef,
		controls: Option<Controls>,
	) -> Result<(), GatewayError> {
		if self.fail_edits.load(Ordering::SeqCst) {
			return Err(GatewayError::Unavailable("edit disabled".into()));
		}
		self.record(RecordedCall::EditControls { message, controls })
			.await;
		Ok(())
	}

	async fn acknowledge_event(
		&self,
		event: &EventRef,
		ack: Acknowledgement,
	) -> Result<(), GatewayError> {
		if self.fail_acknowledgements.load(Ordering::SeqCst) {
			return Err(GatewayError::Unavailable("acknowledge disabled".into()));
		}
		self.record(RecordedCall::Acknowledge {
			event: event.clone(),
			ack,
		})
		.await;
		Ok(())
	}
}

#[async_trait]
impl EventSource for MemoryGateway {
	async fn start(&self, sender: mpsc::UnboundedSender<ActionEvent>) -> Result<(), GatewayError> {
		let mut subscriber = self.subscriber.lock().await;
		if subscriber.is_some() {
			return Err(GatewayError::AlreadyListening);
		}
		*subscriber = Some(sender);
		Ok(())
	}

	async fn stop(&self) -> Result<(), GatewayError> {
		self.subscriber.lock().await.take();
		Ok(())
	}
}

/// The memory gateway takes no settings.
pub struct MemoryGatewaySchema;

impl ConfigSchema for MemoryGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

pub fn create_gateway(config: &toml::Value) -> Result<GatewayHandles, GatewayError> {
	MemoryGatewaySchema
		.validate(config)
		.map_err(|e| GatewayError::Configuration(e.to_string()))?;
	let gateway = Arc::new(MemoryGateway::new());
	Ok(GatewayHandles {
		gateway: gateway.clone(),
		events: gateway,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_sequential_message_ids() {
		let gateway = MemoryGateway::new();
		let first = gateway.send_text(ChatId(1), "a", None).await.unwrap();
		let second = gateway
			.send_photo(ChatId(2), "https://img/1.png", "b", None)
			.await
			.unwrap();

		assert_eq!(first, MessageRef::new(ChatId(1), 1));
		assert_eq!(second, MessageRef::new(ChatId(2), 2));
		assert_eq!(gateway.posted_in(ChatId(2)).await, vec!["b".to_string()]);
	}

	#[tokio::test]
	async fn test_injected_events_reach_subscriber() {
		let gateway = MemoryGateway::new();
		let event = gateway.press("confirm:abc", Some("Lena"), None);
		assert!(gateway.inject(event.clone()).await.is_err());

		let (tx, mut rx) = mpsc::unbounded_channel();
		gateway.start(tx).await.unwrap();
		assert!(gateway.is_listening().await);
		assert!(matches!(
			gateway.start(mpsc::unbounded_channel().0).await,
			Err(GatewayError::AlreadyListening)
		));

		gateway.inject(event.clone()).await.unwrap();
		assert_eq!(rx.recv().await, Some(event));

		gateway.stop().await.unwrap();
		assert!(rx.recv().await.is_none());
	}

	#[tokio::test]
	async fn test_failure_toggles() {
		let gateway = MemoryGateway::new();
		gateway.fail_sends(true);
		assert!(matches!(
			gateway.send_text(ChatId(1), "a", None).await,
			Err(GatewayError::Unavailable(_))
		));
		gateway.fail_sends(false);
		assert!(gateway.send_text(ChatId(1), "a", None).await.is_ok());

		gateway.fail_acknowledgements(true);
		assert!(gateway
			.acknowledge_event(&EventRef::new("cb-1"), Acknowledgement::silent())
			.await
			.is_err());
		assert_eq!(gateway.calls().await.len(), 1);
	}

	#[test]
	fn test_factory_accepts_empty_table() {
		let config = toml::Value::Table(toml::map::Map::new());
		assert!(create_gateway(&config).is_ok());
	}
}
