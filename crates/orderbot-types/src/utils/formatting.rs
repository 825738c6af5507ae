//! String formatting utilities for log fields and staff-facing messages.

use rust_decimal::Decimal;

/// Truncates an identifier for log output.
///
/// Shows only the first 8 characters followed by ".." for longer ids.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((end, _)) => format!("{}..", &id[..end]),
		None => id.to_string(),
	}
}

/// Escapes text for messages sent with HTML parse mode.
pub fn escape_html(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

/// Formats a money amount without trailing zeros.
///
/// `13.50` renders as `13.5` and `9.00` as `9`.
pub fn format_amount(amount: Decimal) -> String {
	amount.normalize().to_string()
}
