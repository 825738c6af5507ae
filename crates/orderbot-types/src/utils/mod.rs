//! Utility functions shared across the relay.

pub mod formatting;
pub mod helpers;

pub use formatting::{escape_html, format_amount, truncate_id};
pub use helpers::current_timestamp;
