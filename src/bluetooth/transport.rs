//! Transport seam consumed by the reconnection engine.

use std::future::Future;

use bluer::Address;

use crate::error::Result;

/// Connect and bond-list primitives of the Bluetooth stack.
///
/// `connect` is fire-and-forget: success means the request was accepted,
/// progress is reported through the link state signal.
pub trait Transport: Send + Sync + 'static {
   fn connect(&self, address: Address) -> impl Future<Output = Result<()>> + Send;

   fn bond_count(&self) -> impl Future<Output = Result<usize>> + Send;

   fn bond_list(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;
}
