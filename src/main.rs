//! A2DP sink reconnection daemon.
//!
//! Remembers the last audio source this node linked to and, on startup or
//! on request, tries to bring that link back while the source is still
//! bonded.

use std::{sync::Arc, time::Duration};

use crossbeam::queue::SegQueue;
use log::{info, warn};
use tokio::{signal, sync::Notify, time};
use zbus::{Connection, connection, object_server::InterfaceRef};

use bluetooth::{bluez::BluezTransport, link::LinkStateSignal, monitor::LinkMonitor};
use dbus::ReconnectService;
use event::{EventBus, ReconnectEvent};
use reconnect::{orchestrator::Reconnector, store::CandidateStore};

mod bluetooth;
mod config;
mod dbus;
mod error;
mod event;
mod reconnect;

use crate::{dbus::ReconnectServiceSignals, error::Result};

const OBJECT_PATH: &str = "/org/a2dpreconnect/manager";

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   info!("Starting A2DP reconnect service...");

   let config = config::Config::load()?;
   let store = CandidateStore::open_default()?;
   match store.load_candidate() {
      Ok(Some(candidate)) => info!("Stored reconnect candidate: {candidate}"),
      Ok(None) => info!("No stored reconnect candidate"),
      Err(e) => warn!("Stored reconnect candidate unreadable: {e}"),
   }

   let event_bus = EventProcessor::new();

   let session = bluer::Session::new().await?;
   let link = LinkStateSignal::new();
   let transport = BluezTransport::open(
      &session,
      config.adapter.as_deref(),
      link.clone(),
      config.connect_timeout(),
   )
   .await?;
   info!("Using adapter {}", transport.adapter().name());

   let adapter = transport.adapter().clone();
   let reconnector = Reconnector::new(
      store,
      transport,
      link.handle(),
      config.attempt_timing(),
      event_bus.clone(),
   );

   let _monitor = LinkMonitor::start(
      adapter,
      link,
      reconnector.clone(),
      config.link_check_interval(),
   )
   .await;

   let connection = connection::Builder::session()?
      .name("org.a2dpreconnect")?
      .serve_at(OBJECT_PATH, ReconnectService::new(reconnector.clone()))?
      .build()
      .await?;

   info!("A2DP reconnect D-Bus service started at org.a2dpreconnect");

   event_bus.spawn_dispatcher(connection).await?;

   if config.reconnect_on_start {
      let _ = reconnector.start_reconnect_task()?;
   }

   signal::ctrl_c().await?;
   info!("Shutting down A2DP reconnect service...");

   Ok(())
}

struct EventProcessor {
   queue: SegQueue<ReconnectEvent>,
   notifier: Notify,
}

impl EventProcessor {
   fn new() -> Arc<Self> {
      Arc::new(Self {
         queue: SegQueue::new(),
         notifier: Notify::new(),
      })
   }
}

impl EventProcessor {
   async fn recv(self: &Arc<Self>) -> Option<ReconnectEvent> {
      loop {
         if let Some(event) = self.queue.pop() {
            return Some(event);
         }
         let notify = self.notifier.notified();
         if let Some(event) = self.queue.pop() {
            return Some(event);
         }
         if Arc::strong_count(self) == 1 {
            return None;
         }
         let _ = time::timeout(Duration::from_secs(1), notify).await;
      }
   }

   async fn dispatch(
      &self,
      iface: &InterfaceRef<ReconnectService>,
      event: ReconnectEvent,
   ) -> Result<()> {
      match event {
         ReconnectEvent::CandidateSaved(addr) => {
            iface
               .candidate_changed(&bluetooth::address::encode(addr))
               .await?;
         },
         ReconnectEvent::CandidateRemoved => {
            iface.candidate_changed("").await?;
         },
         ReconnectEvent::RunFinished(outcome) => {
            let addr_str = outcome
               .address()
               .map(bluetooth::address::encode)
               .unwrap_or_default();
            iface
               .reconnect_finished(outcome.state().into(), &addr_str)
               .await?;
            iface
               .get()
               .await
               .state_changed(iface.signal_emitter())
               .await?;
         },
      }
      Ok(())
   }

   async fn spawn_dispatcher(self: Arc<Self>, connection: Connection) -> Result<()> {
      let iface = connection
         .object_server()
         .interface::<_, ReconnectService>(OBJECT_PATH)
         .await?;
      tokio::spawn(async move {
         while let Some(event) = self.recv().await {
            if let Err(e) = self.dispatch(&iface, event).await {
               warn!("Error dispatching event: {e}");
            }
         }
      });

      Ok(())
   }
}

impl EventBus for EventProcessor {
   fn emit(&self, event: ReconnectEvent) {
      self.queue.push(event);
      self.notifier.notify_waiters();
   }
}
