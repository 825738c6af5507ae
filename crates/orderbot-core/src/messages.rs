//! Staff-facing message bodies.
//!
//! All bodies are sent with HTML parse mode, so every customer or staff
//! supplied string is escaped before it is embedded.

use orderbot_types::{escape_html, format_amount, LineItem, OrderGroup, OrderId};

const RULE: &str = "━━━━━━━━━━━━━━━";

/// `• Margherita x2 = 18$`
pub fn item_line(item: &LineItem) -> String {
	format!(
		"• {} x{} = {}$",
		escape_html(&item.item_name),
		item.quantity,
		format_amount(item.subtotal())
	)
}

fn item_lines(group: &OrderGroup) -> String {
	group
		.items
		.iter()
		.map(item_line)
		.collect::<Vec<_>>()
		.join("\n")
}

fn note_or_none(group: &OrderGroup) -> String {
	match group.note.as_deref() {
		Some(note) if !note.is_empty() => escape_html(note),
		_ => "None".to_string(),
	}
}

/// Announcement of a new pending order in the main chat.
pub fn announcement(order_id: &OrderId, group: &OrderGroup) -> String {
	format!(
		"🆕 <b>New order</b> <code>{id}</code>\n\
		 {RULE}\n\
		 🏬 <b>Branch:</b> {branch}\n\
		 👤 <b>Customer:</b> {name}\n\
		 📞 <b>Phone:</b> {phone}\n\
		 🏠 <b>Address:</b> {address}\n\n\
		 🛒 <b>Items:</b>\n\
		 {items}\n\n\
		 💰 <b>Total:</b> {total}$\n\
		 📝 <b>Note:</b> {note}\n\
		 {RULE}",
		id = escape_html(order_id.as_str()),
		branch = escape_html(&group.branch),
		name = escape_html(&group.customer_name),
		phone = escape_html(&group.phone),
		address = escape_html(&group.address),
		items = item_lines(group),
		total = format_amount(group.total()),
		note = note_or_none(group),
	)
}

/// Detailed brief posted to the workers chat once an order is confirmed.
pub fn prep_brief(group: &OrderGroup) -> String {
	format!(
		"✅ <b>New order confirmed!</b>\n\
		 {RULE}\n\
		 🏬 <b>Branch:</b> {branch}\n\
		 🏠 <b>Delivery Address:</b> {address}\n\
		 👤 <b>Customer:</b> {name}\n\
		 📞 <b>Contact Phone:</b> {phone}\n\n\
		 🍽️ <b>Items to prepare:</b>\n\
		 {items}\n\n\
		 📝 <b>Customer Note:</b> {note}\n\
		 {RULE}",
		branch = escape_html(&group.branch),
		address = escape_html(&group.address),
		name = escape_html(&group.customer_name),
		phone = escape_html(&group.phone),
		items = item_lines(group),
		note = note_or_none(group),
	)
}

pub fn preparing(order_id: &OrderId, actor: &str) -> String {
	format!(
		"👨‍🍳 Order {} is being prepared by {}",
		escape_html(order_id.as_str()),
		escape_html(actor)
	)
}

pub fn delivering(order_id: &OrderId, actor: &str) -> String {
	format!(
		"🛵 Order {} is now out for delivery by {}",
		escape_html(order_id.as_str()),
		escape_html(actor)
	)
}

pub fn completed(order_id: &OrderId, actor: &str) -> String {
	format!(
		"✅ Order {} has been completed by {}",
		escape_html(order_id.as_str()),
		escape_html(actor)
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderbot_types::CustomerId;
	use rust_decimal::Decimal;

	fn group(note: Option<&str>) -> OrderGroup {
		OrderGroup {
			customer_name: "Ana <VIP>".to_string(),
			phone: "555".to_string(),
			address: "1 Main St".to_string(),
			note: note.map(str::to_string),
			branch: "Central".to_string(),
			proof_of_payment: None,
			customer_id: CustomerId(1),
			items: vec![
				LineItem {
					category: "Pizza".to_string(),
					item_name: "Margherita".to_string(),
					quantity: 2,
					unit_price: Decimal::new(900, 2),
				},
				LineItem {
					category: "Drinks".to_string(),
					item_name: "Tea & Lemon".to_string(),
					quantity: 3,
					unit_price: Decimal::new(150, 2),
				},
			],
		}
	}

	#[test]
	fn test_item_line() {
		let group = group(None);
		assert_eq!(item_line(&group.items[0]), "• Margherita x2 = 18$");
		assert_eq!(item_line(&group.items[1]), "• Tea &amp; Lemon x3 = 4.5$");
	}

	#[test]
	fn test_prep_brief() {
		let brief = prep_brief(&group(None));
		assert!(brief.starts_with("✅ <b>New order confirmed!</b>\n━━━━━━━━━━━━━━━\n"));
		assert!(brief.contains("👤 <b>Customer:</b> Ana &lt;VIP&gt;\n"));
		assert!(brief.contains("🍽️ <b>Items to prepare:</b>\n• Margherita x2 = 18$\n• Tea"));
		assert!(brief.contains("📝 <b>Customer Note:</b> None\n"));
		assert!(brief.ends_with(RULE));
	}

	#[test]
	fn test_announcement_carries_total_and_note() {
		let text = announcement(&OrderId::new("abc123"), &group(Some("ring twice")));
		assert!(text.starts_with("🆕 <b>New order</b> <code>abc123</code>"));
		assert!(text.contains("💰 <b>Total:</b> 22.5$"));
		assert!(text.contains("📝 <b>Note:</b> ring twice"));
	}

	#[test]
	fn test_broadcasts() {
		let id = OrderId::new("A7");
		assert_eq!(preparing(&id, "Lena"), "👨‍🍳 Order A7 is being prepared by Lena");
		assert_eq!(delivering(&id, "Lena"), "🛵 Order A7 is now out for delivery by Lena");
		assert_eq!(completed(&id, "Worker"), "✅ Order A7 has been completed by Worker");
	}
}
