//! Error types for the reconnection service.
//!
//! This module defines the crate-wide error type. The candidate store
//! carries its own error enum, which converts into it.

use thiserror::Error;
use tokio::task::JoinError;

use crate::reconnect::store;

/// Main error type for the reconnection service.
#[derive(Error, Debug)]
pub enum ReconnectError {
   #[error("Bluetooth error: {0}")]
   Bluetooth(#[from] bluer::Error),

   #[error("D-Bus error: {0}")]
   DBus(#[from] zbus::Error),

   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Candidate storage error: {0}")]
   Storage(#[from] store::Error),

   #[error("Transport busy with another connection")]
   TransportBusy,

   #[error("Reconnect run already active")]
   AlreadyRunning,

   #[error("Reconnect task panicked: {0}")]
   TaskPanicked(JoinError),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),

   #[error("Adapter not found")]
   AdapterNotFound,
}

/// Convenience type alias for Results with `ReconnectError`.
pub type Result<T> = std::result::Result<T, ReconnectError>;
