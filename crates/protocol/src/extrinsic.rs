//! Signed extrinsic construction (format version 4).
//!
//! The wire layout is:
//!
//! ```text
//! compact(len) ++ 0x84 ++ address ++ signature ++ era ++ compact(nonce)
//!              ++ compact(tip) ++ call
//! ```
//!
//! and the signed payload is `call ++ extra ++ additional` where
//! `extra = (era, nonce, tip)` and `additional = (spec_version,
//! transaction_version, genesis_hash, genesis_hash)`; the second genesis
//! hash stands in for the era checkpoint because every transaction here is
//! immortal. Payloads longer than 256 bytes are hashed before signing.

use parity_scale_codec::{Compact, Encode};
use subxt_signer::sr25519::Keypair;

use crate::call::Call;
use crate::error::Result;
use crate::hashing::blake2_256;
use crate::types::{AccountId32, Era, H256, MultiAddress, MultiSignature};

const SIGNED_V4: u8 = 0x84;

/// Everything besides the call that goes into a signature.
#[derive(Clone, Copy, Debug)]
pub struct SignatureOptions {
    pub genesis_hash: H256,
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// A fully signed extrinsic. Its hash is a pure function of the encoded
/// bytes and is therefore known before the node ever sees it.
#[derive(Clone, Debug)]
pub struct SignedExtrinsic {
    pub signer: AccountId32,
    pub signature: MultiSignature,
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
    pub call: Call,
}

impl SignedExtrinsic {
    /// Sign `call` under `options` with an sr25519 keypair.
    pub fn sign(call: &Call, options: &SignatureOptions, keypair: &Keypair) -> Result<Self> {
        let mut payload = call.encode();
        // extra
        options.era.encode_to(&mut payload);
        Compact(options.nonce).encode_to(&mut payload);
        Compact(options.tip).encode_to(&mut payload);
        // additional
        options.spec_version.encode_to(&mut payload);
        options.transaction_version.encode_to(&mut payload);
        payload.extend_from_slice(options.genesis_hash.as_bytes());
        payload.extend_from_slice(options.genesis_hash.as_bytes());

        let signature = if payload.len() > 256 {
            keypair.sign(&blake2_256(&payload))
        } else {
            keypair.sign(&payload)
        };

        Ok(SignedExtrinsic {
            signer: AccountId32(keypair.public_key().0),
            signature: MultiSignature::Sr25519(signature.0),
            era: options.era,
            nonce: options.nonce,
            tip: options.tip,
            call: call.clone(),
        })
    }

    /// Length-prefixed wire bytes, as submitted and as carried in blocks.
    pub fn encode(&self) -> Vec<u8> {
        let mut inner = Vec::with_capacity(128 + self.call.args.len());
        inner.push(SIGNED_V4);
        MultiAddress::Id(self.signer).encode_to(&mut inner);
        self.signature.encode_to(&mut inner);
        self.era.encode_to(&mut inner);
        Compact(self.nonce).encode_to(&mut inner);
        Compact(self.tip).encode_to(&mut inner);
        self.call.encode_to(&mut inner);

        let mut out = Vec::with_capacity(inner.len() + 4);
        Compact(inner.len() as u32).encode_to(&mut out);
        out.extend_from_slice(&inner);
        out
    }

    /// The transaction hash: blake2_256 over the wire bytes.
    pub fn hash(&self) -> H256 {
        H256(blake2_256(&self.encode()))
    }
}

/// Hash of already-encoded extrinsic wire bytes, for pass-through payloads
/// signed by a caller.
pub fn hash_encoded(wire_bytes: &[u8]) -> H256 {
    H256(blake2_256(wire_bytes))
}
