//! Reconnection engine.
//!
//! This module holds the persisted candidate store, the bonding check, the
//! connection attempt driver and the run state machine tying them together.

pub mod attempt;
pub mod bonding;
pub mod orchestrator;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
