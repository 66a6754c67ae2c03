use log::info;
use serde_json::json;
use zbus::{interface, object_server::SignalEmitter};

use crate::{
   bluetooth::{address, bluez::BluezTransport},
   error::ReconnectError,
   reconnect::orchestrator::Reconnector,
};

pub struct ReconnectService {
   reconnector: Reconnector<BluezTransport>,
}

impl ReconnectService {
   pub const fn new(reconnector: Reconnector<BluezTransport>) -> Self {
      Self { reconnector }
   }
}

#[interface(name = "org.a2dpreconnect.Reconnect")]
impl ReconnectService {
   /// Starts a reconnect run. Returns false when one is already active.
   async fn start_reconnect(&self) -> zbus::fdo::Result<bool> {
      match self.reconnector.start_reconnect_task() {
         Ok(_) => Ok(true),
         Err(ReconnectError::AlreadyRunning) => Ok(false),
         Err(e) => Err(zbus::fdo::Error::Failed(e.to_string())),
      }
   }

   /// Runs a reconnect and waits for it to finish. Returns the terminal
   /// state and the address tried, empty when the run aborted early.
   async fn reconnect(&self) -> zbus::fdo::Result<(String, String)> {
      let outcome = self
         .reconnector
         .reconnect()
         .await
         .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
      let addr = outcome
         .address()
         .map(|a| address::encode(a).to_string())
         .unwrap_or_default();
      Ok((outcome.state().to_string(), addr))
   }

   async fn add_candidate(&self, address: String) -> zbus::fdo::Result<bool> {
      let addr =
         address::parse_any(&address).map_err(|e| zbus::fdo::Error::InvalidArgs(e.to_string()))?;

      self
         .reconnector
         .add_candidate(addr)
         .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;

      info!("Reconnect candidate set to {addr} over D-Bus");
      Ok(true)
   }

   async fn remove_candidate(&self) -> zbus::fdo::Result<bool> {
      self
         .reconnector
         .remove_candidate()
         .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
      Ok(true)
   }

   /// Canonical form of the stored candidate, empty when none.
   async fn get_candidate(&self) -> zbus::fdo::Result<String> {
      let candidate = self
         .reconnector
         .candidate()
         .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
      Ok(candidate.map(|a| address::encode(a).to_string()).unwrap_or_default())
   }

   async fn get_status(&self) -> zbus::fdo::Result<String> {
      let candidate = self.get_candidate().await?;
      Ok(
         json!({
            "state": self.reconnector.state().to_string(),
            "running": self.reconnector.is_running(),
            "candidate": candidate,
         })
         .to_string(),
      )
   }

   // Signals
   #[zbus(signal)]
   pub async fn candidate_changed(emitter: &SignalEmitter<'_>, address: &str) -> zbus::Result<()>;

   #[zbus(signal)]
   pub async fn reconnect_finished(
      emitter: &SignalEmitter<'_>,
      outcome: &str,
      address: &str,
   ) -> zbus::Result<()>;

   #[zbus(property)]
   async fn state(&self) -> String {
      self.reconnector.state().to_string()
   }

   #[zbus(property)]
   async fn running(&self) -> bool {
      self.reconnector.is_running()
   }
}
