//! Handlers for the two inbound flows: staff control presses and order
//! submissions.

pub mod action;
pub mod submission;

pub use action::{ActionHandler, Rejection, TransitionOutcome};
pub use submission::{SubmissionError, SubmissionHandler};
