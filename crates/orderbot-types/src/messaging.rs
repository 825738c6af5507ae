//! Messaging primitives exchanged with the notification gateway.

use crate::{ActionKind, OrderId, StaffAction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat (channel or group) identifier on the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Reference to a posted message, used to edit its controls later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
	pub chat_id: ChatId,
	pub message_id: i64,
}

impl MessageRef {
	pub fn new(chat_id: ChatId, message_id: i64) -> Self {
		Self {
			chat_id,
			message_id,
		}
	}
}

/// Opaque reference to an inbound control press, used to acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRef(String);

impl EventRef {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EventRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A single button attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
	pub label: String,
	/// `action:order_id` token sent back when the button is pressed.
	pub token: String,
}

/// One row of buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
	pub buttons: Vec<Control>,
}

impl Controls {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a button that triggers `kind` on `order_id`.
	pub fn with_action(mut self, label: &str, kind: ActionKind, order_id: &OrderId) -> Self {
		self.buttons.push(Control {
			label: label.to_string(),
			token: StaffAction::new(kind, order_id.clone()).token(),
		});
		self
	}

	/// Controls shown on a freshly announced order.
	pub fn review(order_id: &OrderId) -> Self {
		Self::new()
			.with_action("✅ Confirm", ActionKind::Confirm, order_id)
			.with_action("❌ Decline", ActionKind::Decline, order_id)
	}

	/// Control shown on the prep brief in the workers chat.
	pub fn start_preparing(order_id: &OrderId) -> Self {
		Self::new().with_action("👨‍🍳 I'm preparing", ActionKind::Prepare, order_id)
	}

	pub fn start_delivering(order_id: &OrderId) -> Self {
		Self::new().with_action("🛵 I'm delivering", ActionKind::Deliver, order_id)
	}

	pub fn finish(order_id: &OrderId) -> Self {
		Self::new().with_action("✅ Complete", ActionKind::Complete, order_id)
	}

	pub fn is_empty(&self) -> bool {
		self.buttons.is_empty()
	}
}

/// Reply to an inbound control press.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
	pub text: Option<String>,
	/// Shown as a blocking alert instead of a transient toast.
	pub emphasize: bool,
}

impl Acknowledgement {
	/// Silent acknowledgement that only clears the pressed control's spinner.
	pub fn silent() -> Self {
		Self::default()
	}

	pub fn notice(text: impl Into<String>) -> Self {
		Self {
			text: Some(text.into()),
			emphasize: false,
		}
	}

	pub fn alert(text: impl Into<String>) -> Self {
		Self {
			text: Some(text.into()),
			emphasize: true,
		}
	}
}
