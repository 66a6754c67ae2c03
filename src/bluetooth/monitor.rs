//! Link monitor for the local adapter.
//!
//! bluer doesn't report connect/disconnect as adapter events, so links are
//! detected by a periodic health check. The monitor publishes the link state
//! and turns link-up and unpair events into candidate store updates.

use std::{collections::HashSet, time::Duration};

use bluer::{Adapter, AdapterEvent, Address};
use futures::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::{
   select,
   task::JoinHandle,
   time::{self, MissedTickBehavior},
};

use crate::{
   bluetooth::{
      link::{LinkState, LinkStateSignal},
      transport::Transport,
   },
   reconnect::orchestrator::Reconnector,
};

pub struct LinkMonitor<T> {
   adapter: Adapter,
   signal: LinkStateSignal,
   reconnector: Reconnector<T>,
   connected: HashSet<Address>,
}

impl<T: Transport> LinkMonitor<T> {
   /// Runs one health check so the link state is current before returning,
   /// then keeps monitoring on a background task.
   pub async fn start(
      adapter: Adapter,
      signal: LinkStateSignal,
      reconnector: Reconnector<T>,
      interval: Duration,
   ) -> JoinHandle<()> {
      let mut monitor = Self {
         adapter,
         signal,
         reconnector,
         connected: HashSet::new(),
      };
      monitor.check_links().await;
      tokio::spawn(monitor.run(interval))
   }

   async fn run(mut self, interval: Duration) {
      let mut events = match self.adapter.events().await {
         Ok(events) => events,
         Err(e) => {
            error!("Failed to get adapter events: {e}");
            return;
         },
      };

      let mut health_check_interval = time::interval(interval);
      health_check_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

      loop {
         select! {
            _ = health_check_interval.tick() => {
               self.check_links().await;
            }
            event = events.next() => match event {
               Some(AdapterEvent::DeviceRemoved(addr)) => {
                  debug!("Device removed: {addr}");
                  self.handle_device_removed(addr);
               },
               Some(AdapterEvent::DeviceAdded(addr)) => {
                  debug!("Device added: {addr}");
               },
               Some(_) => {},
               None => {
                  warn!("Adapter event stream ended, stopping link monitor");
                  break;
               },
            },
         }
      }
   }

   async fn check_links(&mut self) {
      let addresses = match self.adapter.device_addresses().await {
         Ok(addresses) => addresses,
         Err(e) => {
            warn!("Failed to list devices: {e}");
            return;
         },
      };

      let mut now_connected = HashSet::new();
      for addr in addresses {
         if let Ok(device) = self.adapter.device(addr)
            && device.is_connected().await.unwrap_or(false)
            && device.is_paired().await.unwrap_or(false)
         {
            now_connected.insert(addr);
         }
      }

      for &addr in now_connected.difference(&self.connected) {
         info!("Link established with {addr}");
         if let Err(e) = self.reconnector.add_candidate(addr) {
            warn!("Failed to record reconnect candidate {addr}: {e}");
         }
      }
      for addr in self.connected.difference(&now_connected) {
         info!("Link to {addr} lost");
      }

      if let Some(state) = next_link_state(self.signal.current(), !now_connected.is_empty()) {
         debug!("Link state -> {state}");
         self.signal.set(state);
      }
      self.connected = now_connected;
   }

   fn handle_device_removed(&mut self, addr: Address) {
      self.connected.remove(&addr);
      match self.reconnector.candidate() {
         Ok(Some(candidate)) if candidate == addr => {
            info!("Reconnect candidate {addr} was unpaired");
            if let Err(e) = self.reconnector.remove_candidate() {
               warn!("Failed to remove reconnect candidate {addr}: {e}");
            }
         },
         Ok(_) => {},
         Err(e) => warn!("Failed to read reconnect candidate: {e}"),
      }
   }
}

/// State to publish after a health check, `None` to leave it unchanged.
///
/// An in-flight `Connecting` is only resolved by a live link or by the
/// connect request itself.
fn next_link_state(current: LinkState, any_connected: bool) -> Option<LinkState> {
   let observed = if any_connected {
      LinkState::Connected
   } else {
      LinkState::Disconnected
   };
   match (current, observed) {
      (LinkState::Connecting, LinkState::Disconnected) => None,
      (current, observed) if current == observed => None,
      (_, observed) => Some(observed),
   }
}
