//! Configuration module for the order relay.
//!
//! Loads the relay configuration from a TOML file. `${VAR}` and
//! `${VAR:-default}` references are substituted from the environment before
//! parsing, and the parsed configuration is validated before it is handed to
//! the engine builder.

use orderbot_types::ChatId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
	/// A required external parameter is absent.
	#[error("Missing configuration: {0}")]
	Missing(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default rendering dumps the whole input.
		let message = err.message().to_string();
		if message.starts_with("missing field") {
			ConfigError::Missing(message)
		} else {
			ConfigError::Parse(message)
		}
	}
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub service: ServiceConfig,
	/// Chats the relay posts to.
	pub chats: ChatsConfig,
	/// Decline ledger policy.
	pub ledger: LedgerConfig,
	/// Order lifecycle housekeeping.
	#[serde(default)]
	pub orders: OrdersConfig,
	pub storage: StorageConfig,
	/// Messaging platform gateway.
	pub gateway: GatewayConfig,
	/// HTTP API server. Disabled when absent.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier of this relay instance, used in logs.
	pub id: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ChatsConfig {
	/// Chat receiving new orders and progress broadcasts.
	pub main_chat_id: ChatId,
	/// Chat receiving prep briefs for confirmed orders.
	pub workers_chat_id: ChatId,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LedgerConfig {
	/// Number of declined orders after which a customer is banned.
	/// Required; there is deliberately no default.
	pub decline_threshold: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct OrdersConfig {
	/// How often terminal orders are pruned from memory.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
	/// How long a declined or completed order stays queryable.
	#[serde(default = "default_terminal_retention_seconds")]
	pub terminal_retention_seconds: u64,
	/// Upper bound on staff action handlers running at once.
	#[serde(default = "default_max_concurrent_handlers")]
	pub max_concurrent_handlers: usize,
}

impl Default for OrdersConfig {
	fn default() -> Self {
		Self {
			cleanup_interval_seconds: default_cleanup_interval_seconds(),
			terminal_retention_seconds: default_terminal_retention_seconds(),
			max_concurrent_handlers: default_max_concurrent_handlers(),
		}
	}
}

fn default_cleanup_interval_seconds() -> u64 {
	600
}

fn default_terminal_retention_seconds() -> u64 {
	86400
}

fn default_max_concurrent_handlers() -> usize {
	32
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Implementation name to raw TOML settings.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the notification gateway and its event source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3005
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME` and supports defaults
/// with `${VAR_NAME:-default}`. Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Missing(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)));
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Checks cross-field constraints serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.chats.main_chat_id.0 == 0 {
			return Err(ConfigError::Validation(
				"chats.main_chat_id must be a non-zero chat id".into(),
			));
		}
		if self.chats.workers_chat_id.0 == 0 {
			return Err(ConfigError::Validation(
				"chats.workers_chat_id must be a non-zero chat id".into(),
			));
		}

		if self.ledger.decline_threshold == 0 {
			return Err(ConfigError::Validation(
				"ledger.decline_threshold must be at least 1".into(),
			));
		}

		if self.orders.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"orders.cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.orders.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"orders.cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}
		if self.orders.max_concurrent_handlers == 0 {
			return Err(ConfigError::Validation(
				"orders.max_concurrent_handlers must be at least 1".into(),
			));
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_primary("gateway", &self.gateway.primary, &self.gateway.implementations)?;

		if let Some(api) = &self.api {
			if api.enabled && api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"api.max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a TOML string: resolves environment variables, deserializes and
/// validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
