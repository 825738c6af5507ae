//! Persistent per-customer decline ledger.
//!
//! Counts how many orders each customer had declined and bans a customer once
//! the count reaches the configured threshold. The whole document is rewritten
//! through the storage service after every mutation; a failed write is logged
//! and the in-memory state stays authoritative.

use orderbot_storage::StorageService;
use orderbot_types::{CustomerId, StorageKey, LEDGER_DOCUMENT_ID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The persisted ledger document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
	#[serde(rename = "blockedUsers", default)]
	pub blocked_users: BTreeMap<CustomerId, bool>,
	#[serde(rename = "declineCount", default)]
	pub decline_count: BTreeMap<CustomerId, u32>,
}

impl LedgerState {
	fn is_banned(&self, customer: CustomerId) -> bool {
		self.blocked_users.get(&customer).copied().unwrap_or(false)
	}

	/// Reconciles counts and bans with `threshold`.
	fn normalize(&mut self, threshold: u32) {
		for (customer, count) in &self.decline_count {
			if *count >= threshold {
				self.blocked_users.insert(*customer, true);
			}
		}
		for (customer, banned) in &self.blocked_users {
			if *banned {
				let count = self.decline_count.entry(*customer).or_insert(0);
				if *count < threshold {
					*count = threshold;
				}
			}
		}
	}
}

/// A customer's standing after a decline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclineRecord {
	pub count: u32,
	pub banned: bool,
}

pub struct DeclineLedger {
	state: Mutex<LedgerState>,
	storage: Arc<StorageService>,
	threshold: u32,
}

impl DeclineLedger {
	/// Loads the ledger from storage.
	///
	/// A missing or unreadable document yields an empty ledger instead of an
	/// error so that a damaged file never blocks startup.
	pub async fn load(storage: Arc<StorageService>, threshold: u32) -> Self {
		let namespace = StorageKey::Ledger.as_str();
		let mut state = match storage.exists(namespace, LEDGER_DOCUMENT_ID).await {
			Ok(false) => {
				debug!("No decline ledger stored yet");
				LedgerState::default()
			},
			Ok(true) => match storage
				.retrieve::<LedgerState>(namespace, LEDGER_DOCUMENT_ID)
				.await
			{
				Ok(state) => state,
				Err(e) => {
					warn!(error = %e, "Decline ledger unreadable, starting empty");
					LedgerState::default()
				},
			},
			Err(e) => {
				warn!(error = %e, "Decline ledger storage unavailable, starting empty");
				LedgerState::default()
			},
		};
		state.normalize(threshold);

		info!(
			customers = state.decline_count.len(),
			banned = state.blocked_users.values().filter(|b| **b).count(),
			threshold,
			"Decline ledger loaded"
		);

		Self {
			state: Mutex::new(state),
			storage,
			threshold,
		}
	}

	pub fn threshold(&self) -> u32 {
		self.threshold
	}

	pub async fn is_banned(&self, customer: CustomerId) -> bool {
		self.state.lock().await.is_banned(customer)
	}

	pub async fn decline_count(&self, customer: CustomerId) -> u32 {
		self.state
			.lock()
			.await
			.decline_count
			.get(&customer)
			.copied()
			.unwrap_or(0)
	}

	pub async fn snapshot(&self) -> LedgerState {
		self.state.lock().await.clone()
	}

	/// Counts one more declined order for `customer` and persists the ledger.
	pub async fn record_decline(&self, customer: CustomerId) -> DeclineRecord {
		let mut state = self.state.lock().await;

		let count = state.decline_count.entry(customer).or_insert(0);
		*count = count.saturating_add(1);
		let count = *count;

		let newly_banned = count >= self.threshold && !state.is_banned(customer);
		if newly_banned {
			state.blocked_users.insert(customer, true);
		}

		// written while still holding the lock so documents land in mutation order
		if let Err(e) = self
			.storage
			.store(StorageKey::Ledger.as_str(), LEDGER_DOCUMENT_ID, &*state)
			.await
		{
			warn!(customer = %customer, error = %e, "Failed to persist decline ledger");
		}

		if newly_banned {
			info!(customer = %customer, declines = count, "Customer banned");
		}

		DeclineRecord {
			count,
			banned: state.is_banned(customer),
		}
	}
}
