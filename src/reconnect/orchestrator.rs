//! Reconnection run state machine and the engine's public operations.
//!
//! A run loads the stored candidate, checks it against the bond list and
//! makes at most one connection attempt. Runs never retry; whoever starts
//! the next run owns the retry policy. Only one run may be active at a time.

use std::{
   fmt,
   sync::{
      Arc,
      atomic::{AtomicBool, Ordering},
   },
};

use bluer::Address;
use crossbeam::atomic::AtomicCell;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::{
   bluetooth::{address, link::LinkStateHandle, transport::Transport},
   error::{ReconnectError, Result},
   event::{EventSender, ReconnectEvent},
   reconnect::{
      attempt::{self, AttemptOutcome, AttemptTiming, FailureCause},
      bonding,
      store::CandidateStore,
   },
};

#[derive(
   Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
   #[default]
   Idle,
   Loading,
   Validating,
   Attempting,
   Succeeded,
   Failed,
   Aborted,
}

impl RunState {
   pub const fn is_in_progress(self) -> bool {
      matches!(self, Self::Loading | Self::Validating | Self::Attempting)
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AbortReason {
   /// A link was already up or being negotiated.
   LinkActive,
   NoCandidate,
   StoreUnavailable,
   /// The candidate was no longer bonded and has been dropped.
   NotBonded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
   Succeeded(Address),
   Failed(Address, FailureCause),
   Aborted(AbortReason),
}

impl RunOutcome {
   pub const fn state(&self) -> RunState {
      match self {
         Self::Succeeded(_) => RunState::Succeeded,
         Self::Failed(..) => RunState::Failed,
         Self::Aborted(_) => RunState::Aborted,
      }
   }

   pub const fn address(&self) -> Option<Address> {
      match self {
         Self::Succeeded(addr) | Self::Failed(addr, _) => Some(*addr),
         Self::Aborted(_) => None,
      }
   }
}

impl fmt::Display for RunOutcome {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Self::Succeeded(addr) => write!(f, "succeeded ({addr})"),
         Self::Failed(addr, cause) => write!(f, "failed ({addr}: {cause})"),
         Self::Aborted(reason) => write!(f, "aborted ({reason})"),
      }
   }
}

struct Engine<T> {
   store: CandidateStore,
   transport: T,
   link: LinkStateHandle,
   timing: AttemptTiming,
   event_tx: EventSender,
   active: AtomicBool,
   state: AtomicCell<RunState>,
}

/// Handle to the reconnection engine. This type is cheaply cloneable.
pub struct Reconnector<T> {
   engine: Arc<Engine<T>>,
}

impl<T> Clone for Reconnector<T> {
   fn clone(&self) -> Self {
      Self {
         engine: self.engine.clone(),
      }
   }
}

impl<T: Transport> Reconnector<T> {
   pub fn new(
      store: CandidateStore,
      transport: T,
      link: LinkStateHandle,
      timing: AttemptTiming,
      event_tx: EventSender,
   ) -> Self {
      Self {
         engine: Arc::new(Engine {
            store,
            transport,
            link,
            timing,
            event_tx,
            active: AtomicBool::new(false),
            state: AtomicCell::new(RunState::Idle),
         }),
      }
   }

   /// Called when a link to `address` has been established.
   pub fn add_candidate(&self, address: Address) -> Result<()> {
      self.engine.store.save_candidate(address)?;
      self
         .engine
         .event_tx
         .emit(ReconnectEvent::CandidateSaved(address));
      Ok(())
   }

   /// Called when the peer has been unlinked. Idempotent.
   pub fn remove_candidate(&self) -> Result<()> {
      self.engine.remove_candidate().map(drop)
   }

   pub fn candidate(&self) -> Result<Option<Address>> {
      Ok(self.engine.store.load_candidate()?)
   }

   /// State of the active run, or the terminal state of the last one.
   pub fn state(&self) -> RunState {
      self.engine.state.load()
   }

   pub fn is_running(&self) -> bool {
      self.engine.active.load(Ordering::Acquire)
   }

   /// Spawns a reconnect run. Fails with `AlreadyRunning` while another run
   /// is active.
   pub fn start_reconnect_task(&self) -> Result<JoinHandle<RunOutcome>> {
      let token = RunToken::acquire(self.engine.clone())?;
      Ok(tokio::spawn(async move {
         let outcome = token.0.run().await;
         let engine = token.0.clone();
         drop(token);
         engine.event_tx.emit(ReconnectEvent::RunFinished(outcome));
         outcome
      }))
   }

   /// Starts a run and waits for its outcome.
   pub async fn reconnect(&self) -> Result<RunOutcome> {
      self
         .start_reconnect_task()?
         .await
         .map_err(ReconnectError::TaskPanicked)
   }
}

/// Exclusive right to run. Released on drop, including when the run task
/// is aborted or panics.
struct RunToken<T>(Arc<Engine<T>>);

impl<T> RunToken<T> {
   fn acquire(engine: Arc<Engine<T>>) -> Result<Self> {
      engine
         .active
         .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
         .map_err(|_| ReconnectError::AlreadyRunning)?;
      engine.state.store(RunState::Idle);
      Ok(Self(engine))
   }
}

impl<T> Drop for RunToken<T> {
   fn drop(&mut self) {
      // A run cut short never reached `finish`
      if self.0.state.load().is_in_progress() {
         warn!("Reconnect run interrupted during {}", self.0.state.load());
         self.0.state.store(RunState::Aborted);
      }
      self.0.active.store(false, Ordering::Release);
   }
}

impl<T: Transport> Engine<T> {
   async fn run(&self) -> RunOutcome {
      info!("Starting reconnect run");
      self.enter(RunState::Loading);

      // Only run if currently disconnected
      if !self.link.is_disconnected() {
         info!("Link is {}, skipping reconnect", self.link.current());
         return self.finish(RunOutcome::Aborted(AbortReason::LinkActive));
      }

      let candidate = match self.store.load_candidate() {
         Ok(Some(candidate)) => candidate,
         Ok(None) => {
            info!("No reconnect candidate stored");
            return self.finish(RunOutcome::Aborted(AbortReason::NoCandidate));
         },
         Err(e) => {
            error!("Failed to load reconnect candidate: {e}");
            return self.finish(RunOutcome::Aborted(AbortReason::StoreUnavailable));
         },
      };

      self.enter(RunState::Validating);
      debug!("Candidate: {}", address::encode(candidate));
      if !bonding::is_bonded(&self.transport, candidate).await {
         info!("Removing unbonded candidate {candidate}");
         if let Err(e) = self.remove_candidate() {
            warn!("Failed to remove unbonded candidate {candidate}: {e}");
         }
         return self.finish(RunOutcome::Aborted(AbortReason::NotBonded));
      }

      self.enter(RunState::Attempting);
      let outcome = match attempt::attempt(&self.transport, &self.link, candidate, self.timing).await
      {
         AttemptOutcome::Connected => RunOutcome::Succeeded(candidate),
         AttemptOutcome::Failed(cause) => RunOutcome::Failed(candidate, cause),
      };
      self.finish(outcome)
   }

   fn remove_candidate(&self) -> Result<bool> {
      let existed = self.store.remove_candidate()?;
      if existed {
         self.event_tx.emit(ReconnectEvent::CandidateRemoved);
      }
      Ok(existed)
   }

   fn enter(&self, state: RunState) {
      debug!("Reconnect run: {} -> {state}", self.state.load());
      self.state.store(state);
   }

   fn finish(&self, outcome: RunOutcome) -> RunOutcome {
      self.enter(outcome.state());
      info!("Reconnect run {outcome}");
      outcome
   }
}
