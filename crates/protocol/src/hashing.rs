//! Hashing and hex helpers shared across the wire format.

pub use sp_crypto_hashing::{blake2_128, blake2_256, twox_128};

use crate::error::{ProtocolError, Result};

/// `blake2_128(data) ++ data`, the concat hasher used by map storage keys.
pub fn blake2_128_concat(data: &[u8]) -> Vec<u8> {
    let mut out = blake2_128(data).to_vec();
    out.extend_from_slice(data);
    out
}

/// Encode bytes as a 0x-prefixed lowercase hex string.
pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Decode a hex string, with or without the 0x prefix.
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(s)?)
}

/// Decode a hex string into a fixed 32-byte array.
pub fn from_hex_32(s: &str) -> Result<[u8; 32]> {
    let bytes = from_hex(s)?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ProtocolError::Length { expected: 32, got })
}
