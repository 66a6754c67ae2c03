//! Single connection attempt against one address.
//!
//! The request is fire-and-forget; the outcome is read back from the link
//! state signal. Sampling is fast until the state first leaves
//! `Disconnected` and slow afterwards, since negotiation start is
//! unpredictable but later transitions are rare.

use std::time::Duration;

use bluer::Address;
use log::{debug, info, warn};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::bluetooth::{
   link::{LinkState, LinkStateHandle},
   transport::Transport,
};

/// Sampling interval while waiting for the first state change.
pub const FAST_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Sampling interval once the link is progressing.
pub const SLOW_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Maximum time to wait for the link to leave `Disconnected`.
pub const FIRST_CHANGE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTiming {
   pub fast_poll: Duration,
   pub slow_poll: Duration,
   /// `None` waits for the first state change indefinitely.
   pub first_change_timeout: Option<Duration>,
}

impl Default for AttemptTiming {
   fn default() -> Self {
      Self {
         fast_poll: FAST_POLL_INTERVAL,
         slow_poll: SLOW_POLL_INTERVAL,
         first_change_timeout: Some(FIRST_CHANGE_TIMEOUT),
      }
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureCause {
   /// The transport refused the connect request.
   Rejected,
   /// The link never left `Disconnected` before the deadline.
   NoProgress,
   /// The link fell back to `Disconnected` after progressing.
   Regressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
   Connected,
   Failed(FailureCause),
}

pub async fn attempt<T: Transport>(
   transport: &T,
   link: &LinkStateHandle,
   address: Address,
   timing: AttemptTiming,
) -> AttemptOutcome {
   info!("Attempting reconnect to {address}");

   if let Err(e) = transport.connect(address).await {
      warn!("Connect request for {address} rejected: {e}");
      return AttemptOutcome::Failed(FailureCause::Rejected);
   }

   // Wait until something happens
   let deadline = timing.first_change_timeout.map(|t| Instant::now() + t);
   let mut fast = time::interval(timing.fast_poll);
   fast.set_missed_tick_behavior(MissedTickBehavior::Skip);
   loop {
      fast.tick().await;
      if !link.is_disconnected() {
         break;
      }
      if deadline.is_some_and(|d| Instant::now() >= d) {
         warn!("No link activity for {address} before deadline");
         return AttemptOutcome::Failed(FailureCause::NoProgress);
      }
   }

   let mut slow = time::interval(timing.slow_poll);
   slow.set_missed_tick_behavior(MissedTickBehavior::Skip);
   loop {
      slow.tick().await;
      match link.current() {
         LinkState::Connected => {
            info!("Connected to {address}");
            return AttemptOutcome::Connected;
         },
         LinkState::Disconnected => {
            info!("Can't connect to {address}");
            return AttemptOutcome::Failed(FailureCause::Regressed);
         },
         LinkState::Connecting => {
            debug!("Waiting for {address}");
         },
      }
   }
}
