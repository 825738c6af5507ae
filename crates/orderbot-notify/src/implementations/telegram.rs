//! Telegram Bot API gateway.
//!
//! Outbound calls use `sendMessage`, `sendPhoto`, `editMessageReplyMarkup`
//! and `answerCallbackQuery` with HTML parse mode. Control presses arrive as
//! callback queries through `getUpdates` long polling.

use crate::{EventSource, GatewayError, GatewayHandles, NotificationGateway};
use async_trait::async_trait;
use orderbot_types::{
	Acknowledgement, ActionEvent, ChatId, ConfigSchema, Controls, EventRef, Field, FieldType,
	MessageRef, Schema, SecretString, ValidationError,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

const DEFAULT_API_URL: &str = "https://api.telegram.org";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
	ok: bool,
	result: Option<T>,
	description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
	id: i64,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
	message_id: i64,
	chat: TgChat,
}

impl TgMessage {
	fn to_ref(&self) -> MessageRef {
		MessageRef::new(ChatId(self.chat.id), self.message_id)
	}
}

#[derive(Debug, Deserialize)]
struct TgUser {
	#[serde(default)]
	first_name: String,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
	id: String,
	from: TgUser,
	message: Option<TgMessage>,
	data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
	update_id: i64,
	callback_query: Option<TgCallbackQuery>,
}

impl TgCallbackQuery {
	fn into_event(self) -> ActionEvent {
		ActionEvent {
			event_ref: EventRef::new(self.id),
			actor: Some(self.from.first_name).filter(|name| !name.is_empty()),
			message: self.message.as_ref().map(TgMessage::to_ref),
			data: self.data.unwrap_or_default(),
		}
	}
}

/// Renders controls as a one-row inline keyboard.
fn inline_keyboard(controls: &Controls) -> Value {
	let row: Vec<Value> = controls
		.buttons
		.iter()
		.map(|button| json!({ "text": button.label, "callback_data": button.token }))
		.collect();
	json!({ "inline_keyboard": [row] })
}

/// Bot API client shared by the gateway and the polling task.
#[derive(Clone)]
struct BotClient {
	http: reqwest::Client,
	api_url: String,
	token: SecretString,
}

impl BotClient {
	async fn call<T: DeserializeOwned>(
		&self,
		method: &str,
		body: Value,
		timeout: Option<Duration>,
	) -> Result<T, GatewayError> {
		let url = self
			.token
			.with_exposed(|token| format!("{}/bot{}/{}", self.api_url, token, method));

		let mut request = self.http.post(url).json(&body);
		if let Some(timeout) = timeout {
			request = request.timeout(timeout);
		}

		// Errors carry the request URL, which embeds the token.
		let response = request
			.send()
			.await
			.map_err(|e| GatewayError::Unavailable(format!("{}: {}", method, e.without_url())))?;
		let status = response.status();
		let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
			GatewayError::Unavailable(format!(
				"{}: unreadable response ({}): {}",
				method,
				status,
				e.without_url()
			))
		})?;

		if !envelope.ok {
			return Err(GatewayError::Rejected(format!(
				"{}: {}",
				method,
				envelope
					.description
					.unwrap_or_else(|| status.to_string())
			)));
		}
		envelope
			.result
			.ok_or_else(|| GatewayError::Unavailable(format!("{}: empty result", method)))
	}
}

/// Telegram gateway and callback-query event source.
pub struct TelegramGateway {
	client: BotClient,
	poll_timeout_secs: u64,
	is_running: Arc<AtomicBool>,
	stop_signal: Mutex<Option<mpsc::Sender<()>>>,
}

impl TelegramGateway {
	pub fn new(
		token: SecretString,
		api_url: &str,
		poll_timeout_secs: u64,
		request_timeout_secs: u64,
	) -> Result<Self, GatewayError> {
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(request_timeout_secs))
			.build()
			.map_err(|e| GatewayError::Configuration(format!("HTTP client: {}", e)))?;

		Ok(Self {
			client: BotClient {
				http,
				api_url: api_url.trim_end_matches('/').to_string(),
				token,
			},
			poll_timeout_secs,
			is_running: Arc::new(AtomicBool::new(false)),
			stop_signal: Mutex::new(None),
		})
	}

	/// Long-polls `getUpdates` and forwards callback queries until stopped.
	async fn polling_loop(
		client: BotClient,
		poll_timeout_secs: u64,
		sender: mpsc::UnboundedSender<ActionEvent>,
		mut stop_rx: mpsc::Receiver<()>,
		is_running: Arc<AtomicBool>,
	) {
		let mut offset: Option<i64> = None;
		// getUpdates holds the connection open for up to the poll timeout.
		let request_timeout = Duration::from_secs(poll_timeout_secs + 10);

		loop {
			let body = json!({
				"offset": offset,
				"timeout": poll_timeout_secs,
				"allowed_updates": ["callback_query"],
			});

			let updates = tokio::select! {
				_ = stop_rx.recv() => break,
				result = client.call::<Vec<TgUpdate>>("getUpdates", body, Some(request_timeout)) => result,
			};

			let updates = match updates {
				Ok(updates) => updates,
				Err(e) => {
					warn!(error = %e, "Polling for updates failed, retrying");
					tokio::select! {
						_ = stop_rx.recv() => break,
						_ = tokio::time::sleep(POLL_RETRY_DELAY) => continue,
					}
				},
			};

			if !updates.is_empty() {
				debug!(count = updates.len(), "Received updates");
			}

			for update in updates {
				offset = Some(update.update_id + 1);
				let Some(query) = update.callback_query else {
					continue;
				};
				if sender.send(query.into_event()).is_err() {
					info!("Action event receiver dropped, stopping polling");
					is_running.store(false, Ordering::SeqCst);
					return;
				}
			}
		}

		is_running.store(false, Ordering::SeqCst);
		info!("Stopped polling for updates");
	}
}

#[async_trait]
impl NotificationGateway for TelegramGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TelegramGatewaySchema)
	}

	async fn send_text(
		&self,
		chat: ChatId,
		body: &str,
		controls: Option<Controls>,
	) -> Result<MessageRef, GatewayError> {
		let mut request = json!({
			"chat_id": chat.0,
			"text": body,
			"parse_mode": "HTML",
		});
		if let Some(controls) = controls.filter(|c| !c.is_empty()) {
			request["reply_markup"] = inline_keyboard(&controls);
		}

		let message: TgMessage = self.client.call("sendMessage", request, None).await?;
		Ok(message.to_ref())
	}

	async fn send_photo(
		&self,
		chat: ChatId,
		image_ref: &str,
		caption: &str,
		controls: Option<Controls>,
	) -> Result<MessageRef, GatewayError> {
		let mut request = json!({
			"chat_id": chat.0,
			"photo": image_ref,
			"caption": caption,
			"parse_mode": "HTML",
		});
		if let Some(controls) = controls.filter(|c| !c.is_empty()) {
			request["reply_markup"] = inline_keyboard(&controls);
		}

		let message: TgMessage = self.client.call("sendPhoto", request, None).await?;
		Ok(message.to_ref())
	}

	async fn edit_controls(
		&self,
		message: MessageRef,
		controls: Option<Controls>,
	) -> Result<(), GatewayError> {
		let mut request = json!({
			"chat_id": message.chat_id.0,
			"message_id": message.message_id,
		});
		// Omitting reply_markup removes the keyboard.
		if let Some(controls) = controls.filter(|c| !c.is_empty()) {
			request["reply_markup"] = inline_keyboard(&controls);
		}

		// Returns the edited message, or `true` for inline messages.
		let _: Value = self
			.client
			.call("editMessageReplyMarkup", request, None)
			.await?;
		Ok(())
	}

	async fn acknowledge_event(
		&self,
		event: &EventRef,
		ack: Acknowledgement,
	) -> Result<(), GatewayError> {
		let mut request = json!({
			"callback_query_id": event.as_str(),
			"show_alert": ack.emphasize,
		});
		if let Some(text) = ack.text {
			request["text"] = Value::String(text);
		}

		let _: bool = self
			.client
			.call("answerCallbackQuery", request, None)
			.await?;
		Ok(())
	}
}

#[async_trait]
impl EventSource for TelegramGateway {
	async fn start(&self, sender: mpsc::UnboundedSender<ActionEvent>) -> Result<(), GatewayError> {
		if self.is_running.swap(true, Ordering::SeqCst) {
			return Err(GatewayError::AlreadyListening);
		}

		let (stop_tx, stop_rx) = mpsc::channel(1);
		*self.stop_signal.lock().await = Some(stop_tx);

		let client = self.client.clone();
		let poll_timeout_secs = self.poll_timeout_secs;
		let is_running = self.is_running.clone();
		tokio::spawn(async move {
			Self::polling_loop(client, poll_timeout_secs, sender, stop_rx, is_running).await;
		});

		info!(
			poll_timeout_secs = self.poll_timeout_secs,
			"Started polling for action events"
		);
		Ok(())
	}

	async fn stop(&self) -> Result<(), GatewayError> {
		if let Some(stop_tx) = self.stop_signal.lock().await.take() {
			let _ = stop_tx.send(()).await;
		}
		Ok(())
	}
}

/// Configuration schema for the Telegram gateway.
pub struct TelegramGatewaySchema;

impl ConfigSchema for TelegramGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("bot_token", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(token) if token.trim().is_empty() => {
							Err("bot_token cannot be empty".to_string())
						},
						_ => Ok(()),
					}
				}),
			],
			vec![
				Field::new("api_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("api_url must be an http(s) URL".to_string()),
					}
				}),
				Field::new(
					"poll_timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(50),
					},
				),
				Field::new(
					"request_timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);

		schema.validate(config)
	}
}

/// Builds the Telegram gateway from its config table.
///
/// Configuration parameters:
/// - `bot_token`: Bot API token (required)
/// - `api_url`: Bot API base URL (default: "https://api.telegram.org")
/// - `poll_timeout_seconds`: long-polling timeout, 1..=50 (default: 30)
/// - `request_timeout_seconds`: timeout for outbound calls (default: 60)
pub fn create_gateway(config: &toml::Value) -> Result<GatewayHandles, GatewayError> {
	TelegramGatewaySchema.validate(config).map_err(|e| match e {
		ValidationError::MissingField(field) => {
			GatewayError::Configuration(format!("missing required setting '{}'", field))
		},
		other => GatewayError::Configuration(other.to_string()),
	})?;

	let token = config
		.get("bot_token")
		.and_then(|v| v.as_str())
		.map(|token| SecretString::new(token.to_string()))
		.ok_or_else(|| GatewayError::Configuration("bot_token is required".to_string()))?;
	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_URL);
	let poll_timeout_secs = config
		.get("poll_timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);
	let request_timeout_secs = config
		.get("request_timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

	let gateway = Arc::new(TelegramGateway::new(
		token,
		api_url,
		poll_timeout_secs,
		request_timeout_secs,
	)?);
	Ok(GatewayHandles {
		gateway: gateway.clone(),
		events: gateway,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderbot_types::OrderId;

	#[test]
	fn test_inline_keyboard_shape() {
		let keyboard = inline_keyboard(&Controls::review(&OrderId::new("abc")));
		assert_eq!(
			keyboard,
			json!({
				"inline_keyboard": [[
					{ "text": "✅ Confirm", "callback_data": "confirm:abc" },
					{ "text": "❌ Decline", "callback_data": "decline:abc" }
				]]
			})
		);
	}

	#[test]
	fn test_callback_query_becomes_action_event() {
		let update: TgUpdate = serde_json::from_value(json!({
			"update_id": 10,
			"callback_query": {
				"id": "4382",
				"from": { "id": 99, "is_bot": false, "first_name": "Lena" },
				"message": { "message_id": 55, "chat": { "id": -1001, "type": "supergroup" } },
				"data": "prepare:abc"
			}
		}))
		.unwrap();

		let event = update.callback_query.unwrap().into_event();
		assert_eq!(event.event_ref, EventRef::new("4382"));
		assert_eq!(event.actor_name(), "Lena");
		assert_eq!(event.message, Some(MessageRef::new(ChatId(-1001), 55)));
		assert_eq!(event.data, "prepare:abc");
	}

	#[test]
	fn test_callback_without_name_or_data() {
		let query: TgCallbackQuery = serde_json::from_value(json!({
			"id": "1",
			"from": { "id": 99, "is_bot": false }
		}))
		.unwrap();

		let event = query.into_event();
		assert_eq!(event.actor, None);
		assert_eq!(event.actor_name(), "Worker");
		assert_eq!(event.data, "");
		assert_eq!(event.message, None);
	}

	#[test]
	fn test_error_envelope() {
		let envelope: ApiResponse<Value> = serde_json::from_value(json!({
			"ok": false,
			"error_code": 400,
			"description": "Bad Request: message is not modified"
		}))
		.unwrap();
		assert!(!envelope.ok);
		assert!(envelope.result.is_none());
		assert_eq!(
			envelope.description.as_deref(),
			Some("Bad Request: message is not modified")
		);
	}

	#[test]
	fn test_schema_requires_token() {
		let missing: toml::Value = toml::from_str("poll_timeout_seconds = 30").unwrap();
		match create_gateway(&missing) {
			Err(GatewayError::Configuration(message)) => assert!(message.contains("bot_token")),
			_ => panic!("expected configuration error"),
		}

		let bad_timeout: toml::Value =
			toml::from_str("bot_token = \"1:x\"\npoll_timeout_seconds = 120").unwrap();
		assert!(create_gateway(&bad_timeout).is_err());

		let bad_url: toml::Value =
			toml::from_str("bot_token = \"1:x\"\napi_url = \"ftp://example\"").unwrap();
		assert!(create_gateway(&bad_url).is_err());
	}

	#[tokio::test]
	async fn test_factory_builds_gateway() {
		let config: toml::Value = toml::from_str(
			r#"
			bot_token = "123456:ABC"
			api_url = "http://127.0.0.1:9/"
			poll_timeout_seconds = 5
			"#,
		)
		.unwrap();
		let handles = create_gateway(&config).unwrap();
		// stopping a source that never started is fine
		handles.events.stop().await.unwrap();
	}
}
