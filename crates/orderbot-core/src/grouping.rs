//! Folds a submitted batch into per-customer order groups.

use crate::ledger::DeclineLedger;
use orderbot_types::{CustomerId, GroupKey, OrderGroup, SubmittedItem};
use std::collections::HashMap;

/// Partitions `items` by their composite key.
///
/// Groups come out in order of first appearance and keep their items in
/// submission order. Every input item lands in exactly one group.
pub fn group_items(items: &[SubmittedItem]) -> Vec<OrderGroup> {
	let mut index: HashMap<GroupKey<'_>, usize> = HashMap::new();
	let mut groups: Vec<OrderGroup> = Vec::new();

	for item in items {
		match index.get(&item.group_key()) {
			Some(&position) => groups[position].push(item),
			None => {
				index.insert(item.group_key(), groups.len());
				groups.push(OrderGroup::from_first_item(item));
			},
		}
	}

	groups
}

/// A batch with banned customers' items removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenedBatch {
	pub groups: Vec<OrderGroup>,
	/// Banned customers found in the batch, each listed once.
	pub blocked: Vec<CustomerId>,
}

/// Drops the items of banned customers, then groups the rest.
pub async fn screen_batch(items: &[SubmittedItem], ledger: &DeclineLedger) -> ScreenedBatch {
	let mut blocked = Vec::new();
	let mut allowed = Vec::with_capacity(items.len());

	for item in items {
		if blocked.contains(&item.customer_id) {
			continue;
		}
		if ledger.is_banned(item.customer_id).await {
			blocked.push(item.customer_id);
			continue;
		}
		allowed.push(item.clone());
	}

	ScreenedBatch {
		groups: group_items(&allowed),
		blocked,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderbot_storage::implementations::memory::MemoryStorage;
	use orderbot_storage::StorageService;
	use rust_decimal::Decimal;
	use std::sync::Arc;

	fn item(name: &str, address: &str, menu_item: &str, customer: i64) -> SubmittedItem {
		SubmittedItem {
			name: name.to_string(),
			phone: "555-0100".to_string(),
			address: address.to_string(),
			branch: "Central".to_string(),
			note: None,
			category: "Mains".to_string(),
			item_name: menu_item.to_string(),
			quantity: 1,
			unit_price: Decimal::new(450, 2),
			proof_of_payment: None,
			customer_id: CustomerId(customer),
		}
	}

	#[test]
	fn test_three_plus_one_partition() {
		let items = vec![
			item("Ana", "1 Main St", "Soup", 1),
			item("Ana", "1 Main St", "Bread", 1),
			item("Ana", "2 Side St", "Salad", 1),
			item("Ana", "1 Main St", "Tea", 1),
		];

		let groups = group_items(&items);
		assert_eq!(groups.len(), 2);
		assert_eq!(groups[0].address, "1 Main St");
		let names: Vec<_> = groups[0].items.iter().map(|i| i.item_name.as_str()).collect();
		assert_eq!(names, vec!["Soup", "Bread", "Tea"]);
		assert_eq!(groups[1].items.len(), 1);
		assert_eq!(groups[1].items[0].item_name, "Salad");
	}

	#[test]
	fn test_every_item_lands_once() {
		let mut items = Vec::new();
		for n in 0..12 {
			let name = ["Ana", "Ben", "Caz"][n % 3];
			let address = ["North", "South"][n % 2];
			items.push(item(name, address, &format!("dish-{}", n), n as i64));
		}

		let groups = group_items(&items);
		assert_eq!(groups.len(), 6);

		let mut seen: Vec<String> = groups
			.iter()
			.flat_map(|g| g.items.iter().map(|i| i.item_name.clone()))
			.collect();
		seen.sort();
		let mut expected: Vec<String> = items.iter().map(|i| i.item_name.clone()).collect();
		expected.sort();
		assert_eq!(seen, expected);
	}

	#[test]
	fn test_key_is_exact() {
		let mut noted = item("Ana", "1 Main St", "Soup", 1);
		noted.note = Some("no onions".to_string());
		let mut empty_note = item("Ana", "1 Main St", "Bread", 1);
		empty_note.note = Some(String::new());
		let items = vec![
			item("Ana", "1 Main St", "Tea", 1),
			item("ana", "1 Main St", "Cake", 1),
			item("Ana", "1 Main St ", "Pie", 1),
			noted,
			empty_note,
		];

		let groups = group_items(&items);
		// absent and empty notes share a group; case and whitespace do not fold
		assert_eq!(groups.len(), 4);
		assert_eq!(groups[0].items.len(), 2);
	}

	#[test]
	fn test_group_takes_first_customer_and_proof() {
		let first = item("Ana", "1 Main St", "Soup", 10);
		let mut second = item("Ana", "1 Main St", "Bread", 11);
		second.proof_of_payment = Some("https://pay/1.png".to_string());
		let mut third = item("Ana", "1 Main St", "Tea", 12);
		third.proof_of_payment = Some("https://pay/2.png".to_string());

		let groups = group_items(&[first, second, third]);
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].customer_id, CustomerId(10));
		assert_eq!(groups[0].proof_of_payment.as_deref(), Some("https://pay/1.png"));
		assert_eq!(groups[0].total(), Decimal::new(1350, 2));
	}

	#[tokio::test]
	async fn test_screen_removes_banned_customers() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let ledger = DeclineLedger::load(storage, 1).await;
		ledger.record_decline(CustomerId(2)).await;

		let items = vec![
			item("Ben", "North", "Soup", 2),
			item("Ana", "South", "Soup", 1),
			item("Ben", "North", "Tea", 2),
			item("Caz", "West", "Pie", 3),
		];

		let screened = screen_batch(&items, &ledger).await;
		assert_eq!(screened.blocked, vec![CustomerId(2)]);
		assert_eq!(screened.groups.len(), 2);
		assert!(screened
			.groups
			.iter()
			.all(|g| g.customer_id != CustomerId(2)));
	}
}
