//! Builder for assembling an [`OrderEngine`] from configured implementations.
//!
//! Storage and gateway backends are picked by name from factory maps, so the
//! binary decides which implementations exist and the config decides which
//! one runs.

use crate::engine::OrderEngine;
use crate::ledger::DeclineLedger;
use orderbot_config::Config;
use orderbot_notify::{GatewayError, GatewayHandles};
use orderbot_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions keyed by implementation name.
pub struct RelayFactories<SF, GF> {
	pub storage_factories: HashMap<String, SF>,
	pub gateway_factories: HashMap<String, GF>,
}

pub struct RelayBuilder {
	config: Config,
}

impl RelayBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine from the primary storage and gateway implementations.
	pub async fn build<SF, GF>(
		self,
		factories: RelayFactories<SF, GF>,
	) -> Result<OrderEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		GF: Fn(&toml::Value) -> Result<GatewayHandles, GatewayError>,
	{
		let storage_backend = {
			let (name, config) = primary_entry(
				"storage",
				&self.config.storage.primary,
				&self.config.storage.implementations,
			)?;
			let factory = factories.storage_factories.get(name).ok_or_else(|| {
				BuilderError::MissingComponent(format!("storage implementation '{}'", name))
			})?;
			factory(config).map_err(|e| {
				error!(component = "storage", implementation = %name, error = %e, "Failed to create storage implementation");
				BuilderError::Config(format!(
					"Failed to create storage implementation '{}': {}",
					name, e
				))
			})?
		};
		info!(component = "storage", implementation = %self.config.storage.primary, "Loaded");

		let gateway = {
			let (name, config) = primary_entry(
				"gateway",
				&self.config.gateway.primary,
				&self.config.gateway.implementations,
			)?;
			let factory = factories.gateway_factories.get(name).ok_or_else(|| {
				BuilderError::MissingComponent(format!("gateway implementation '{}'", name))
			})?;
			factory(config).map_err(|e| {
				error!(component = "gateway", implementation = %name, error = %e, "Failed to create gateway implementation");
				BuilderError::Config(format!(
					"Failed to create gateway implementation '{}': {}",
					name, e
				))
			})?
		};
		info!(component = "gateway", implementation = %self.config.gateway.primary, "Loaded");

		let storage = Arc::new(StorageService::new(storage_backend));
		let ledger =
			Arc::new(DeclineLedger::load(storage, self.config.ledger.decline_threshold).await);

		Ok(OrderEngine::new(self.config, ledger, gateway))
	}
}

fn primary_entry<'a>(
	component: &str,
	primary: &'a str,
	implementations: &'a HashMap<String, toml::Value>,
) -> Result<(&'a str, &'a toml::Value), BuilderError> {
	implementations
		.get(primary)
		.map(|config| (primary, config))
		.ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary {} '{}' has no configuration",
				component, primary
			))
		})
}
