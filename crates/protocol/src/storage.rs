//! Storage-key construction for the handful of entries the service reads.

use crate::hashing::{blake2_128_concat, twox_128};
use crate::types::AccountId32;

fn prefixed(pallet: &str, item: &str) -> Vec<u8> {
    let mut key = twox_128(pallet.as_bytes()).to_vec();
    key.extend_from_slice(&twox_128(item.as_bytes()));
    key
}

/// `System.Account(account)` — holds `AccountInfo` (nonce, balances).
pub fn system_account_key(account: &AccountId32) -> Vec<u8> {
    let mut key = prefixed("System", "Account");
    key.extend_from_slice(&blake2_128_concat(account.as_bytes()));
    key
}

/// `System.Events` — the per-block event records.
pub fn system_events_key() -> Vec<u8> {
    prefixed("System", "Events")
}
