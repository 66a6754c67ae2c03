//! Connection state signal shared between the transport and the
//! reconnection engine.
//!
//! The transport owns the writer side. Everything else holds a read-only
//! [`LinkStateHandle`] and samples it.

use std::sync::Arc;

use tokio::sync::watch;

/// Tri-state audio link state as reported by the transport.
#[derive(
   Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum LinkState {
   #[default]
   Disconnected,
   Connecting,
   Connected,
}

/// Writer side of the link state. Cheaply cloneable.
#[derive(Debug, Clone)]
pub struct LinkStateSignal {
   tx: Arc<watch::Sender<LinkState>>,
}

impl LinkStateSignal {
   pub fn new() -> Self {
      Self::with_state(LinkState::Disconnected)
   }

   pub fn with_state(state: LinkState) -> Self {
      let (tx, _rx) = watch::channel(state);
      Self { tx: Arc::new(tx) }
   }

   /// Publishes a new state, returning the previous one.
   pub fn set(&self, state: LinkState) -> LinkState {
      self.tx.send_replace(state)
   }

   pub fn current(&self) -> LinkState {
      *self.tx.borrow()
   }

   /// Read-only view for consumers of the signal.
   pub fn handle(&self) -> LinkStateHandle {
      LinkStateHandle {
         rx: self.tx.subscribe(),
      }
   }
}

impl Default for LinkStateSignal {
   fn default() -> Self {
      Self::new()
   }
}

/// Read-only snapshot access to the link state.
#[derive(Debug, Clone)]
pub struct LinkStateHandle {
   rx: watch::Receiver<LinkState>,
}

impl LinkStateHandle {
   pub fn current(&self) -> LinkState {
      *self.rx.borrow()
   }

   pub fn is_disconnected(&self) -> bool {
      self.current() == LinkState::Disconnected
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_handle_observes_writer() {
      let signal = LinkStateSignal::new();
      let handle = signal.handle();
      assert!(handle.is_disconnected());

      assert_eq!(signal.set(LinkState::Connecting), LinkState::Disconnected);
      assert_eq!(handle.current(), LinkState::Connecting);

      signal.clone().set(LinkState::Connected);
      assert_eq!(handle.current(), LinkState::Connected);
      assert_eq!(signal.current(), LinkState::Connected);
   }

   #[test]
   fn test_display_is_snake_case() {
      assert_eq!(LinkState::Connecting.to_string(), "connecting");
   }
}
