//! Canonical text form of Bluetooth device addresses.
//!
//! Persisted candidates are stored as 12 lowercase hex characters with no
//! separators, e.g. `001122334455`.

use std::str::FromStr;

use bluer::Address;
use smol_str::SmolStr;
use thiserror::Error;

/// Length of the canonical text form.
pub const ENCODED_LEN: usize = 12;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddressParseError {
   #[error("expected 12 hex characters, got {0}")]
   InvalidLength(usize),

   #[error("invalid hex: {0}")]
   InvalidHex(#[from] hex::FromHexError),

   #[error("unrecognised address format: {0}")]
   Unrecognised(SmolStr),
}

/// Encodes an address as 12 lowercase hex characters.
pub fn encode(address: Address) -> SmolStr {
   SmolStr::from(hex::encode(address.0))
}

/// Decodes the canonical 12-character form.
pub fn decode(text: &str) -> Result<Address, AddressParseError> {
   if text.len() != ENCODED_LEN {
      return Err(AddressParseError::InvalidLength(text.len()));
   }
   let mut bytes = [0u8; 6];
   hex::decode_to_slice(text, &mut bytes)?;
   Ok(Address(bytes))
}

/// Accepts either the canonical form or the colon-separated form used by
/// BlueZ (`AA:BB:CC:DD:EE:FF`).
pub fn parse_any(text: &str) -> Result<Address, AddressParseError> {
   let text = text.trim();
   if text.contains(':') {
      Address::from_str(text).map_err(|_| AddressParseError::Unrecognised(text.into()))
   } else {
      decode(text)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_encode_is_lowercase_and_zero_padded() {
      let addr = Address([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
      assert_eq!(encode(addr), "001122334455");

      let addr = Address([0xAB, 0x0C, 0xFF, 0x01, 0xE0, 0x0A]);
      assert_eq!(encode(addr), "ab0cff01e00a");
   }

   #[test]
   fn test_encode_covers_every_byte_value() {
      for b in 0..=255u8 {
         let addr = Address([b, b, b, b, b, b]);
         let text = encode(addr);
         assert_eq!(text.len(), ENCODED_LEN);
         assert!(
            text
               .bytes()
               .all(|c| c.is_ascii_digit() || (b'a'..=b'f').contains(&c)),
            "bad encoding {text} for {b:#04x}"
         );
         assert_eq!(decode(&text).unwrap(), addr);
      }
   }

   #[test]
   fn test_decode_rejects_wrong_length() {
      assert_eq!(
         decode("0011223344"),
         Err(AddressParseError::InvalidLength(10))
      );
      assert_eq!(
         decode("00112233445566"),
         Err(AddressParseError::InvalidLength(14))
      );
      assert_eq!(decode(""), Err(AddressParseError::InvalidLength(0)));
   }

   #[test]
   fn test_decode_rejects_non_hex() {
      assert!(matches!(
         decode("00112233445g"),
         Err(AddressParseError::InvalidHex(_))
      ));
   }

   #[test]
   fn test_decode_accepts_uppercase() {
      assert_eq!(
         decode("AABBCCDDEEFF").unwrap(),
         Address([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
      );
   }

   #[test]
   fn test_parse_any_accepts_both_forms() {
      let expected = Address([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
      assert_eq!(parse_any("00:11:22:33:44:55").unwrap(), expected);
      assert_eq!(parse_any(" 001122334455 ").unwrap(), expected);
      assert!(matches!(
         parse_any("00:11:22"),
         Err(AddressParseError::Unrecognised(_))
      ));
   }
}
