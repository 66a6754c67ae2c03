//! Event handling for reconnection status updates.
//!
//! Candidate changes and finished reconnect runs are published through an
//! [`EventBus`] so the daemon can forward them, e.g. as D-Bus signals.

use std::sync::Arc;

use bluer::Address;

use crate::reconnect::orchestrator::RunOutcome;

/// Events that can be emitted by the reconnection engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectEvent {
   CandidateSaved(Address),
   CandidateRemoved,
   RunFinished(RunOutcome),
}

/// Trait for implementing event emission.
pub trait EventBus: Send + Sync {
   /// Emits an event to all registered listeners.
   fn emit(&self, event: ReconnectEvent);
}

/// Type alias for a thread-safe event sender.
pub type EventSender = Arc<dyn EventBus>;
