//! Scriptable in-memory transport for engine tests.

use std::{
   sync::{
      Arc,
      atomic::{AtomicBool, AtomicUsize, Ordering},
   },
   time::Duration,
};

use bluer::Address;
use parking_lot::Mutex;
use tokio::time;

use crate::{
   bluetooth::{
      link::{LinkState, LinkStateSignal},
      transport::Transport,
   },
   error::{ReconnectError, Result},
};

/// How the fake stack reacts to a connect request.
#[derive(Debug, Clone, Copy)]
pub enum ConnectScript {
   Reject,
   /// Accepts the request but never reports progress.
   Silent,
   Succeed {
      pending_after: Duration,
      settle_after: Duration,
   },
   Fail {
      pending_after: Duration,
      settle_after: Duration,
   },
}

#[derive(Clone)]
pub struct FakeTransport(Arc<Inner>);

struct Inner {
   signal: LinkStateSignal,
   script: Mutex<ConnectScript>,
   bonded: Mutex<Vec<Address>>,
   bond_queries_fail: AtomicBool,
   bond_count_queries: AtomicUsize,
   bond_list_fetches: AtomicUsize,
   connects: Mutex<Vec<Address>>,
}

impl FakeTransport {
   pub fn new() -> (Self, LinkStateSignal) {
      let signal = LinkStateSignal::new();
      let transport = Self(Arc::new(Inner {
         signal: signal.clone(),
         script: Mutex::new(ConnectScript::Silent),
         bonded: Mutex::new(Vec::new()),
         bond_queries_fail: AtomicBool::new(false),
         bond_count_queries: AtomicUsize::new(0),
         bond_list_fetches: AtomicUsize::new(0),
         connects: Mutex::new(Vec::new()),
      }));
      (transport, signal)
   }

   pub fn bond(&self, address: Address) {
      self.0.bonded.lock().push(address);
   }

   pub fn fail_bond_queries(&self) {
      self.0.bond_queries_fail.store(true, Ordering::SeqCst);
   }

   pub fn script(&self, script: ConnectScript) {
      *self.0.script.lock() = script;
   }

   pub fn bond_queries(&self) -> usize {
      self.0.bond_count_queries.load(Ordering::SeqCst) + self.bond_list_fetches()
   }

   pub fn bond_list_fetches(&self) -> usize {
      self.0.bond_list_fetches.load(Ordering::SeqCst)
   }

   pub fn connect_requests(&self) -> Vec<Address> {
      self.0.connects.lock().clone()
   }

   fn spawn_progress(&self, pending_after: Duration, settle_after: Duration, end: LinkState) {
      let signal = self.0.signal.clone();
      tokio::spawn(async move {
         time::sleep(pending_after).await;
         signal.set(LinkState::Connecting);
         time::sleep(settle_after).await;
         signal.set(end);
      });
   }
}

impl Transport for FakeTransport {
   async fn connect(&self, address: Address) -> Result<()> {
      self.0.connects.lock().push(address);
      let script = *self.0.script.lock();
      match script {
         ConnectScript::Reject => return Err(ReconnectError::TransportBusy),
         ConnectScript::Silent => {},
         ConnectScript::Succeed {
            pending_after,
            settle_after,
         } => self.spawn_progress(pending_after, settle_after, LinkState::Connected),
         ConnectScript::Fail {
            pending_after,
            settle_after,
         } => self.spawn_progress(pending_after, settle_after, LinkState::Disconnected),
      }
      Ok(())
   }

   async fn bond_count(&self) -> Result<usize> {
      self.0.bond_count_queries.fetch_add(1, Ordering::SeqCst);
      if self.0.bond_queries_fail.load(Ordering::SeqCst) {
         return Err(ReconnectError::AdapterNotFound);
      }
      Ok(self.0.bonded.lock().len())
   }

   async fn bond_list(&self) -> Result<Vec<Address>> {
      self.0.bond_list_fetches.fetch_add(1, Ordering::SeqCst);
      if self.0.bond_queries_fail.load(Ordering::SeqCst) {
         return Err(ReconnectError::AdapterNotFound);
      }
      Ok(self.0.bonded.lock().clone())
   }
}
