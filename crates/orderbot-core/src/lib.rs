//! Core relay logic.
//!
//! Ties together the order registry, the decline ledger and the notification
//! gateway. The [`OrderEngine`] is the single owner of mutable state in a
//! relay process; the HTTP API and the gateway event source both feed it.

pub mod builder;
pub mod engine;
pub mod grouping;
pub mod handlers;
pub mod ledger;
pub mod messages;
pub mod state;

pub use builder::{BuilderError, RelayBuilder, RelayFactories};
pub use engine::{EngineError, OrderEngine};
pub use handlers::{Rejection, SubmissionError, TransitionOutcome};
pub use ledger::{DeclineLedger, DeclineRecord, LedgerState};
pub use state::{OrderRegistry, RegistryError};
