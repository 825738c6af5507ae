//! Storage-related types for the relay.

use std::str::FromStr;

/// Identifier of the persisted decline ledger document.
pub const LEDGER_DOCUMENT_ID: &str = "blocked_users";

/// Storage namespaces.
///
/// Replaces string literals in storage calls with a typed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Decline ledger (blocked customers and decline counters)
	Ledger,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Ledger => "ledger",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Ledger].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"ledger" => Ok(Self::Ledger),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
