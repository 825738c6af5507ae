//! Common types module for the order relay.
//!
//! This module defines the core data types shared by every relay component:
//! submitted line items, grouped customer orders, the order lifecycle status,
//! staff action tokens and the messaging primitives exchanged with the
//! notification gateway.

/// Staff action tokens and the events that carry them.
pub mod action;
/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Messaging primitives shared with the notification gateway.
pub mod messaging;
/// Order types including line items, grouped orders and lifecycle status.
pub mod order;
/// Redacting wrapper for secrets such as the bot token.
pub mod secret_string;
/// Storage types for managing persistent data.
pub mod storage;
/// Utility functions for formatting and timestamps.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use action::*;
pub use api::*;
pub use messaging::*;
pub use order::*;
pub use secret_string::SecretString;
pub use storage::*;
pub use utils::{current_timestamp, escape_html, format_amount, truncate_id};
pub use validation::*;
