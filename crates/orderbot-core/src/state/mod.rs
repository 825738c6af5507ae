//! In-memory order state.
//!
//! The registry is the single owner of every order's lifecycle status. All
//! transitions go through it so racing staff actions on the same order are
//! serialized.

pub mod registry;

pub use registry::{OrderRegistry, RegistryError};
