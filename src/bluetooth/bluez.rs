//! BlueZ implementation of the transport seam.
//!
//! Connect requests target the remote A2DP source profile and run on their
//! own task; their progress is published on the link state signal.

use std::{
   sync::{
      Arc,
      atomic::{AtomicBool, Ordering},
   },
   time::Duration,
};

use bluer::{Adapter, Address, Session};
use log::{debug, info, warn};
use tokio::time;
use uuid::Uuid;

use crate::{
   bluetooth::{
      link::{LinkState, LinkStateSignal},
      transport::Transport,
   },
   error::{ReconnectError, Result},
};

/// A2DP Audio Source service class. The local node is the sink, so it
/// connects to the remote source profile.
pub const A2DP_SOURCE_UUID: Uuid = Uuid::from_u128(0x0000110a_0000_1000_8000_00805f9b34fb);

#[derive(Clone)]
pub struct BluezTransport {
   adapter: Adapter,
   signal: LinkStateSignal,
   connect_timeout: Duration,
   in_flight: Arc<AtomicBool>,
}

impl BluezTransport {
   /// Opens the named adapter, or the default one when `name` is `None`.
   pub async fn open(
      session: &Session,
      name: Option<&str>,
      signal: LinkStateSignal,
      connect_timeout: Duration,
   ) -> Result<Self> {
      let adapter = match name {
         Some(name) => session
            .adapter(name)
            .map_err(|_| ReconnectError::AdapterNotFound)?,
         None => session
            .default_adapter()
            .await
            .map_err(|_| ReconnectError::AdapterNotFound)?,
      };

      if !adapter.is_powered().await? {
         adapter.set_powered(true).await?;
         info!("Powered on adapter: {}", adapter.name());
      }

      Ok(Self {
         adapter,
         signal,
         connect_timeout,
         in_flight: Arc::new(AtomicBool::new(false)),
      })
   }

   pub const fn adapter(&self) -> &Adapter {
      &self.adapter
   }

   async fn bonded_devices(&self) -> Result<Vec<Address>> {
      let mut bonded = Vec::new();
      for addr in self.adapter.device_addresses().await? {
         let device = self.adapter.device(addr)?;
         if device.is_paired().await.unwrap_or(false) {
            bonded.push(addr);
         }
      }
      Ok(bonded)
   }
}

impl Transport for BluezTransport {
   async fn connect(&self, address: Address) -> Result<()> {
      if self
         .in_flight
         .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
         .is_err()
      {
         return Err(ReconnectError::TransportBusy);
      }

      let device = match self.adapter.device(address) {
         Ok(device) => device,
         Err(e) => {
            self.in_flight.store(false, Ordering::Release);
            return Err(e.into());
         },
      };

      debug!("Requesting A2DP connection to {address}");
      self.signal.set(LinkState::Connecting);

      let signal = self.signal.clone();
      let in_flight = self.in_flight.clone();
      let timeout = self.connect_timeout;
      tokio::spawn(async move {
         let state = match time::timeout(timeout, device.connect_profile(&A2DP_SOURCE_UUID)).await {
            Ok(Ok(())) => {
               debug!("A2DP profile connected to {address}");
               LinkState::Connected
            },
            Ok(Err(e)) => {
               warn!("A2DP connection to {address} failed: {e}");
               LinkState::Disconnected
            },
            Err(_) => {
               warn!("A2DP connection to {address} timed out");
               LinkState::Disconnected
            },
         };
         signal.set(state);
         in_flight.store(false, Ordering::Release);
      });

      Ok(())
   }

   async fn bond_count(&self) -> Result<usize> {
      Ok(self.bonded_devices().await?.len())
   }

   async fn bond_list(&self) -> Result<Vec<Address>> {
      self.bonded_devices().await
   }
}
