//! Staff action tokens.
//!
//! Every control attached to an order message carries a token of the form
//! `action:order_id`. Tokens are parsed into a [`StaffAction`] at the
//! boundary so the transition coordinator only ever sees validated input.

use crate::{EventRef, MessageRef, OrderId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing an action token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionParseError {
	#[error("Action token has no ':' separator: {0}")]
	MissingSeparator(String),
	#[error("Unknown action: {0}")]
	UnknownAction(String),
	#[error("Action token has an empty order id")]
	EmptyOrderId,
}

/// The staff actions an order control can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
	Confirm,
	Decline,
	Prepare,
	Deliver,
	Complete,
}

impl ActionKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ActionKind::Confirm => "confirm",
			ActionKind::Decline => "decline",
			ActionKind::Prepare => "prepare",
			ActionKind::Deliver => "deliver",
			ActionKind::Complete => "complete",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Confirm,
			Self::Decline,
			Self::Prepare,
			Self::Deliver,
			Self::Complete,
		]
		.into_iter()
	}
}

impl FromStr for ActionKind {
	type Err = ActionParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"confirm" => Ok(Self::Confirm),
			"decline" => Ok(Self::Decline),
			"prepare" => Ok(Self::Prepare),
			"deliver" => Ok(Self::Deliver),
			"complete" => Ok(Self::Complete),
			other => Err(ActionParseError::UnknownAction(other.to_string())),
		}
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A validated `action:order_id` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaffAction {
	pub kind: ActionKind,
	pub order_id: OrderId,
}

impl StaffAction {
	pub fn new(kind: ActionKind, order_id: OrderId) -> Self {
		Self { kind, order_id }
	}

	/// Renders the token carried by a control button.
	pub fn token(&self) -> String {
		format!("{}:{}", self.kind, self.order_id)
	}
}

impl FromStr for StaffAction {
	type Err = ActionParseError;

	/// Splits on the first ':' only, so order ids may themselves contain ':'.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (action, order_id) = s
			.split_once(':')
			.ok_or_else(|| ActionParseError::MissingSeparator(s.to_string()))?;
		let kind = action.parse::<ActionKind>()?;
		if order_id.is_empty() {
			return Err(ActionParseError::EmptyOrderId);
		}
		Ok(Self::new(kind, OrderId::new(order_id)))
	}
}

impl fmt::Display for StaffAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.kind, self.order_id)
	}
}

/// An inbound control press, as delivered by the event source.
///
/// `data` is the raw token; it is parsed into a [`StaffAction`] before the
/// event reaches the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
	/// Reference used to acknowledge the press.
	pub event_ref: EventRef,
	/// Display name of the staff member who pressed the control.
	pub actor: Option<String>,
	/// Message the pressed control is attached to, when known.
	pub message: Option<MessageRef>,
	/// Raw `action:order_id` token.
	pub data: String,
}

impl ActionEvent {
	/// Name shown in broadcasts about this press.
	pub fn actor_name(&self) -> &str {
		self.actor
			.as_deref()
			.filter(|name| !name.is_empty())
			.unwrap_or("Worker")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_every_action() {
		for kind in ActionKind::all() {
			let token = format!("{}:abc123", kind);
			let action: StaffAction = token.parse().unwrap();
			assert_eq!(action.kind, kind);
			assert_eq!(action.order_id.as_str(), "abc123");
			assert_eq!(action.token(), token);
		}
	}

	#[test]
	fn test_order_id_may_contain_separator() {
		let action: StaffAction = "confirm:a:b:c".parse().unwrap();
		assert_eq!(action.kind, ActionKind::Confirm);
		assert_eq!(action.order_id.as_str(), "a:b:c");
	}

	#[test]
	fn test_rejects_malformed_tokens() {
		assert_eq!(
			"confirm".parse::<StaffAction>(),
			Err(ActionParseError::MissingSeparator("confirm".to_string()))
		);
		assert_eq!(
			"cancel:abc".parse::<StaffAction>(),
			Err(ActionParseError::UnknownAction("cancel".to_string()))
		);
		assert_eq!(
			"Confirm:abc".parse::<StaffAction>(),
			Err(ActionParseError::UnknownAction("Confirm".to_string()))
		);
		assert_eq!(
			"decline:".parse::<StaffAction>(),
			Err(ActionParseError::EmptyOrderId)
		);
	}

	#[test]
	fn test_actor_name_defaults_to_worker() {
		let mut event = ActionEvent {
			event_ref: EventRef::new("cb-1"),
			actor: None,
			message: None,
			data: "prepare:abc".to_string(),
		};
		assert_eq!(event.actor_name(), "Worker");

		event.actor = Some(String::new());
		assert_eq!(event.actor_name(), "Worker");

		event.actor = Some("Lena".to_string());
		assert_eq!(event.actor_name(), "Lena");
	}
}
