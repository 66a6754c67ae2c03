//! Bluetooth layer for the reconnection engine.
//!
//! This module provides the device address codec, the link state signal,
//! the transport seam and its BlueZ implementation, and the link monitor
//! feeding link-up and unlink events into the engine.

pub mod address;
pub mod bluez;
pub mod link;
pub mod monitor;
pub mod transport;
