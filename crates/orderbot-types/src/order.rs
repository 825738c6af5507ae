//! Order types for the relay.
//!
//! A customer submission arrives as a flat list of [`SubmittedItem`]s. The
//! grouping stage folds them into [`OrderGroup`]s, and the registry tracks each
//! group as an [`Order`] moving through its [`OrderStatus`] lifecycle.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque order identifier.
///
/// The relay never inspects the token; short codes and long random tokens
/// are equally valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for OrderId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for OrderId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

/// Messaging-platform user id of the customer who submitted an item.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CustomerId(pub i64);

impl fmt::Display for CustomerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A single line item as posted by the storefront.
///
/// Customer fields are repeated on every item; the grouping stage uses them
/// to decide which items belong to the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedItem {
	pub name: String,
	pub phone: String,
	pub address: String,
	#[serde(rename = "branchName")]
	pub branch: String,
	#[serde(default)]
	pub note: Option<String>,
	#[serde(rename = "menuCategory")]
	pub category: String,
	#[serde(rename = "menuItem")]
	pub item_name: String,
	pub quantity: u32,
	#[serde(rename = "price")]
	pub unit_price: Decimal,
	/// Proof-of-payment image reference (URL).
	#[serde(rename = "qrImage", default)]
	pub proof_of_payment: Option<String>,
	#[serde(rename = "telegramId")]
	pub customer_id: CustomerId,
}

impl SubmittedItem {
	/// Returns the composite key deciding group membership.
	pub fn group_key(&self) -> GroupKey<'_> {
		GroupKey {
			name: &self.name,
			phone: &self.phone,
			address: &self.address,
			branch: &self.branch,
			note: self.note.as_deref().unwrap_or(""),
		}
	}

	/// Splits off the line item part of the submission.
	pub fn line_item(&self) -> LineItem {
		LineItem {
			category: self.category.clone(),
			item_name: self.item_name.clone(),
			quantity: self.quantity,
			unit_price: self.unit_price,
		}
	}
}

/// Composite grouping key: (name, phone, address, branch, note-or-empty).
///
/// Equality is exact; no trimming or case folding is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey<'a> {
	pub name: &'a str,
	pub phone: &'a str,
	pub address: &'a str,
	pub branch: &'a str,
	pub note: &'a str,
}

/// One menu item entry within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
	pub category: String,
	pub item_name: String,
	pub quantity: u32,
	pub unit_price: Decimal,
}

impl LineItem {
	/// Unit price times quantity, or `None` when it does not fit a `Decimal`.
	pub fn checked_subtotal(&self) -> Option<Decimal> {
		self.unit_price.checked_mul(Decimal::from(self.quantity))
	}

	/// Saturates at `Decimal::MAX`.
	pub fn subtotal(&self) -> Decimal {
		self.unit_price.saturating_mul(Decimal::from(self.quantity))
	}
}

/// A grouped customer submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderGroup {
	pub customer_name: String,
	pub phone: String,
	pub address: String,
	pub note: Option<String>,
	pub branch: String,
	pub proof_of_payment: Option<String>,
	pub customer_id: CustomerId,
	pub items: Vec<LineItem>,
}

impl OrderGroup {
	/// Starts a group from the first item that carries its key.
	pub fn from_first_item(item: &SubmittedItem) -> Self {
		Self {
			customer_name: item.name.clone(),
			phone: item.phone.clone(),
			address: item.address.clone(),
			note: item.note.clone(),
			branch: item.branch.clone(),
			proof_of_payment: item.proof_of_payment.clone(),
			customer_id: item.customer_id,
			items: vec![item.line_item()],
		}
	}

	/// Appends an item that shares this group's key.
	pub fn push(&mut self, item: &SubmittedItem) {
		if self.proof_of_payment.is_none() {
			self.proof_of_payment = item.proof_of_payment.clone();
		}
		self.items.push(item.line_item());
	}

	/// Sum of all subtotals, or `None` on overflow.
	pub fn checked_total(&self) -> Option<Decimal> {
		self.items
			.iter()
			.try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.checked_subtotal()?))
	}

	pub fn total(&self) -> Decimal {
		self.items
			.iter()
			.fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.subtotal()))
	}
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Announced to staff, waiting for confirm or decline.
	Pending,
	/// Confirmed and being prepared or delivered.
	Active,
	/// Declined by staff (terminal).
	Declined,
	/// Delivered and closed (terminal).
	Completed,
}

impl OrderStatus {
	/// Checks whether `self -> to` is an edge of the lifecycle.
	pub fn can_transition_to(self, to: OrderStatus) -> bool {
		matches!(
			(self, to),
			(OrderStatus::Pending, OrderStatus::Active)
				| (OrderStatus::Pending, OrderStatus::Declined)
				| (OrderStatus::Active, OrderStatus::Completed)
		)
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, OrderStatus::Declined | OrderStatus::Completed)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Active => "active",
			OrderStatus::Declined => "declined",
			OrderStatus::Completed => "completed",
		};
		f.write_str(s)
	}
}

/// An order tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub id: OrderId,
	pub status: OrderStatus,
	pub group: OrderGroup,
	/// Unix timestamp of creation.
	pub created_at: u64,
	/// Unix timestamp of the last status change.
	pub updated_at: u64,
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	fn item(note: Option<&str>) -> SubmittedItem {
		SubmittedItem {
			name: "Ana".to_string(),
			phone: "555-0101".to_string(),
			address: "1 Main St".to_string(),
			branch: "Central".to_string(),
			note: note.map(str::to_string),
			category: "Pizza".to_string(),
			item_name: "Margherita".to_string(),
			quantity: 3,
			unit_price: Decimal::from_str("4.50").unwrap(),
			proof_of_payment: None,
			customer_id: CustomerId(42),
		}
	}

	#[test]
	fn test_subtotal_and_total() {
		let mut group = OrderGroup::from_first_item(&item(None));
		let mut second = item(None);
		second.quantity = 1;
		second.unit_price = Decimal::from_str("2.25").unwrap();
		group.push(&second);

		assert_eq!(group.items[0].subtotal(), Decimal::from_str("13.50").unwrap());
		assert_eq!(group.total(), Decimal::from_str("15.75").unwrap());
		assert_eq!(group.checked_total(), Some(group.total()));
	}

	#[test]
	fn test_overflowing_amounts() {
		let mut huge = item(None);
		huge.unit_price = Decimal::from_i128_with_scale(10_i128.pow(28), 0);
		huge.quantity = 10;
		assert_eq!(huge.line_item().checked_subtotal(), None);
		assert_eq!(huge.line_item().subtotal(), Decimal::MAX);

		let mut big = item(None);
		big.unit_price = Decimal::MAX;
		big.quantity = 1;
		let mut group = OrderGroup::from_first_item(&big);
		group.push(&big);
		assert!(group.items[0].checked_subtotal().is_some());
		assert_eq!(group.checked_total(), None);
		assert_eq!(group.total(), Decimal::MAX);
	}

	#[test]
	fn test_missing_note_matches_empty_note() {
		let a = item(None);
		let b = item(Some(""));
		let c = item(Some("no onions"));

		assert_eq!(a.group_key(), b.group_key());
		assert_ne!(a.group_key(), c.group_key());
	}

	#[test]
	fn test_group_takes_first_proof_of_payment() {
		let mut group = OrderGroup::from_first_item(&item(None));
		let mut with_proof = item(None);
		with_proof.proof_of_payment = Some("https://img.example/1.png".to_string());
		group.push(&with_proof);
		let mut other_proof = item(None);
		other_proof.proof_of_payment = Some("https://img.example/2.png".to_string());
		group.push(&other_proof);

		assert_eq!(
			group.proof_of_payment.as_deref(),
			Some("https://img.example/1.png")
		);
	}

	#[test]
	fn test_lifecycle_edges() {
		use OrderStatus::*;
		let all = [Pending, Active, Declined, Completed];
		let allowed = [(Pending, Active), (Pending, Declined), (Active, Completed)];

		for from in all {
			for to in all {
				assert_eq!(
					from.can_transition_to(to),
					allowed.contains(&(from, to)),
					"{from} -> {to}"
				);
			}
		}
		assert!(Declined.is_terminal());
		assert!(Completed.is_terminal());
		assert!(!Pending.is_terminal());
		assert!(!Active.is_terminal());
	}

	#[test]
	fn test_submitted_item_wire_names() {
		let json = r#"{
			"name": "Ana",
			"phone": "555-0101",
			"address": "1 Main St",
			"branchName": "Central",
			"menuCategory": "Pizza",
			"menuItem": "Margherita",
			"quantity": 2,
			"price": 4.5,
			"qrImage": "https://img.example/proof.png",
			"telegramId": 123456789
		}"#;

		let parsed: SubmittedItem = serde_json::from_str(json).unwrap();
		assert_eq!(parsed.branch, "Central");
		assert_eq!(parsed.note, None);
		assert_eq!(parsed.customer_id, CustomerId(123456789));
		assert_eq!(parsed.line_item().subtotal(), Decimal::from(9));
	}
}
