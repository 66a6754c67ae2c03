//! Bond list membership check.
//!
//! Fails closed: an empty or unreadable bond list means "not bonded", so a
//! stale candidate is pruned instead of being retried on every start.

use bluer::Address;
use log::{debug, warn};

use crate::bluetooth::transport::Transport;

pub async fn is_bonded<T: Transport>(transport: &T, address: Address) -> bool {
   let count = match transport.bond_count().await {
      Ok(count) => count,
      Err(e) => {
         warn!("Failed to query bond count: {e}");
         return false;
      },
   };
   if count == 0 {
      debug!("Bond list is empty");
      return false;
   }

   match transport.bond_list().await {
      Ok(bonded) => bonded.iter().any(|&b| b == address),
      Err(e) => {
         warn!("Failed to fetch bond list: {e}");
         false
      },
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::reconnect::testing::FakeTransport;

   const PEER: Address = Address([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
   const OTHER: Address = Address([0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);

   #[tokio::test]
   async fn test_member_of_bond_list() {
      let (transport, _signal) = FakeTransport::new();
      transport.bond(OTHER);
      transport.bond(PEER);
      assert!(is_bonded(&transport, PEER).await);
   }

   #[tokio::test]
   async fn test_absent_from_bond_list() {
      let (transport, _signal) = FakeTransport::new();
      transport.bond(OTHER);
      assert!(!is_bonded(&transport, PEER).await);
   }

   #[tokio::test]
   async fn test_empty_bond_list_skips_fetch() {
      let (transport, _signal) = FakeTransport::new();
      assert!(!is_bonded(&transport, PEER).await);
      assert_eq!(transport.bond_list_fetches(), 0);
   }

   #[tokio::test]
   async fn test_query_failure_is_not_bonded() {
      let (transport, _signal) = FakeTransport::new();
      transport.bond(PEER);
      transport.fail_bond_queries();
      assert!(!is_bonded(&transport, PEER).await);
   }
}
