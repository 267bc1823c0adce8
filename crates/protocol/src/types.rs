//! Core wire types: hashes, account ids, addresses, signatures, eras and
//! the account metadata stored under `System.Account`.

use std::fmt;
use std::str::FromStr;

use parity_scale_codec::{Decode, Encode};

use crate::error::{ProtocolError, Result};
use crate::hashing;

/// A 32-byte hash (block hash, genesis hash, transaction hash).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct H256(pub [u8; 32]);

impl H256 {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hashing::to_hex(&self.0)
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self.to_hex())
    }
}

impl FromStr for H256 {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(H256(hashing::from_hex_32(s)?))
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }
}

/// A 32-byte account public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct AccountId32(pub [u8; 32]);

impl AccountId32 {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AccountId32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId32({})", hashing::to_hex(&self.0))
    }
}

impl FromStr for AccountId32 {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(AccountId32(hashing::from_hex_32(s)?))
    }
}

impl From<[u8; 32]> for AccountId32 {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId32(bytes)
    }
}

/// Sender address. Only the `Id` form is produced by this service; the
/// variant index matters for the wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum MultiAddress {
    #[codec(index = 0)]
    Id(AccountId32),
}

/// Transaction signature, tagged by scheme.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum MultiSignature {
    #[codec(index = 0)]
    Ed25519([u8; 64]),
    #[codec(index = 1)]
    Sr25519([u8; 64]),
}

/// Transaction validity window. Every transaction this service signs is
/// immortal; the mortal space is reserved but never constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Era {
    #[default]
    Immortal,
}

impl Encode for Era {
    fn encode_to<T: parity_scale_codec::Output + ?Sized>(&self, dest: &mut T) {
        match self {
            Era::Immortal => dest.push_byte(0x00),
        }
    }
}

impl Decode for Era {
    fn decode<I: parity_scale_codec::Input>(
        input: &mut I,
    ) -> std::result::Result<Self, parity_scale_codec::Error> {
        match input.read_byte()? {
            0x00 => Ok(Era::Immortal),
            _ => Err("mortal eras are not supported".into()),
        }
    }
}

/// Balance bookkeeping inside `AccountInfo`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, Default)]
pub struct AccountData {
    pub free: u128,
    pub reserved: u128,
    pub frozen: u128,
    pub flags: u128,
}

/// The `System.Account` storage value. The nonce is the field the submitter
/// cares about; the rest rides along so decoding stays honest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, Default)]
pub struct AccountInfo {
    pub nonce: u32,
    pub consumers: u32,
    pub providers: u32,
    pub sufficients: u32,
    pub data: AccountData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h256_hex_round_trip() {
        let h = H256([7u8; 32]);
        let parsed: H256 = h.to_hex().parse().unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn era_immortal_is_single_zero_byte() {
        assert_eq!(Era::Immortal.encode(), vec![0x00]);
    }

    #[test]
    fn multiaddress_id_prefixes_zero() {
        let addr = MultiAddress::Id(AccountId32([9u8; 32]));
        let encoded = addr.encode();
        assert_eq!(encoded.len(), 33);
        assert_eq!(encoded[0], 0x00);
    }

    #[test]
    fn account_info_round_trip() {
        let info = AccountInfo {
            nonce: 41,
            consumers: 1,
            providers: 1,
            sufficients: 0,
            data: AccountData {
                free: 1_000_000,
                ..Default::default()
            },
        };
        let decoded = AccountInfo::decode(&mut info.encode().as_slice()).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn account_info_rejects_truncated_input() {
        let bytes = AccountInfo::default().encode();
        assert!(AccountInfo::decode(&mut &bytes[..bytes.len() - 1]).is_err());
    }
}
