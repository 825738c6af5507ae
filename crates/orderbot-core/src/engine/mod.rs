//! Order engine that owns all relay state.
//!
//! The engine wires the registry, the decline ledger and the notification
//! gateway to the two handlers, and runs the loop that dispatches staff
//! control presses onto bounded worker tasks.

use crate::handlers::{ActionHandler, SubmissionError, SubmissionHandler};
use crate::ledger::DeclineLedger;
use crate::state::{OrderRegistry, RegistryError};
use orderbot_config::Config;
use orderbot_notify::{EventSource, GatewayHandles, NotificationService};
use orderbot_types::{Order, OrderId, SubmitOrdersResponse, SubmittedItem};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};

/// Errors that can occur while the engine is running.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Service error: {0}")]
	Service(String),
}

/// The single service object of a relay process.
#[derive(Clone)]
pub struct OrderEngine {
	pub(crate) config: Config,
	pub(crate) registry: Arc<OrderRegistry>,
	pub(crate) ledger: Arc<DeclineLedger>,
	pub(crate) notifier: NotificationService,
	pub(crate) events: Arc<dyn EventSource>,
	pub(crate) action_handler: Arc<ActionHandler>,
	pub(crate) submission_handler: Arc<SubmissionHandler>,
}

impl OrderEngine {
	pub fn new(config: Config, ledger: Arc<DeclineLedger>, gateway: GatewayHandles) -> Self {
		let registry = Arc::new(OrderRegistry::new());
		let notifier = NotificationService::new(gateway.gateway);

		let action_handler = Arc::new(ActionHandler::new(
			registry.clone(),
			ledger.clone(),
			notifier.clone(),
			config.chats,
		));

		let submission_handler = Arc::new(SubmissionHandler::new(
			registry.clone(),
			ledger.clone(),
			notifier.clone(),
			config.chats,
		));

		Self {
			config,
			registry,
			ledger,
			notifier,
			events: gateway.events,
			action_handler,
			submission_handler,
		}
	}

	/// Runs until Ctrl-C.
	pub async fn run(&self) -> Result<(), EngineError> {
		self.run_until(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				error!(error = %e, "Failed to listen for shutdown signal");
			}
		})
		.await
	}

	/// Runs until `shutdown` resolves or the event source closes.
	pub async fn run_until<S>(&self, shutdown: S) -> Result<(), EngineError>
	where
		S: Future<Output = ()>,
	{
		let (event_tx, mut event_rx) = mpsc::unbounded_channel();
		self.events
			.start(event_tx)
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;
		info!(service = %self.config.service.id, "Relay started");

		// Terminal order cleanup
		let registry = self.registry.clone();
		let retention = Duration::from_secs(self.config.orders.terminal_retention_seconds);
		let cleanup_interval =
			tokio::time::interval(Duration::from_secs(self.config.orders.cleanup_interval_seconds));
		let cleanup_handle = tokio::spawn(async move {
			let mut interval = cleanup_interval;
			loop {
				interval.tick().await;
				let removed = registry.prune_terminal(retention).await;
				if removed > 0 {
					debug!(removed, "Pruned terminal orders");
				}
			}
		});

		let semaphore = Arc::new(Semaphore::new(self.config.orders.max_concurrent_handlers));
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				event = event_rx.recv() => match event {
					Some(event) => {
						self.spawn_handler(&semaphore, move |engine| async move {
							engine.action_handler.handle(event).await;
						})
						.await;
					},
					None => {
						warn!("Event source closed");
						break;
					},
				},

				_ = &mut shutdown => {
					break;
				}
			}
		}

		cleanup_handle.abort();

		self.events
			.stop()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;
		info!("Relay stopped");

		Ok(())
	}

	/// Announces a submitted batch. Callable while the loop runs.
	pub async fn submit_orders(
		&self,
		items: Vec<SubmittedItem>,
	) -> Result<SubmitOrdersResponse, SubmissionError> {
		self.submission_handler.handle(items).await
	}

	pub async fn order(&self, order_id: &OrderId) -> Result<Order, RegistryError> {
		self.registry.get(order_id).await
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn registry(&self) -> &Arc<OrderRegistry> {
		&self.registry
	}

	pub fn ledger(&self) -> &Arc<DeclineLedger> {
		&self.ledger
	}

	pub fn notifier(&self) -> &NotificationService {
		&self.notifier
	}

	/// Spawns `handler` once a permit is free, keeping the permit until the
	/// task ends.
	async fn spawn_handler<F, Fut>(&self, semaphore: &Arc<Semaphore>, handler: F)
	where
		F: FnOnce(OrderEngine) -> Fut + Send + 'static,
		Fut: Future<Output = ()> + Send,
	{
		let engine = self.clone();
		match semaphore.clone().acquire_owned().await {
			Ok(permit) => {
				tokio::spawn(async move {
					let _permit = permit;
					handler(engine).await;
				});
			},
			Err(e) => {
				error!(error = %e, "Failed to acquire handler permit");
			},
		}
	}
}
