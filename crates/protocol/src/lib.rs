//! Binary codec primitives for the ledger wire format: calls, signed
//! extrinsics, account metadata, block events and the storage-key scheme.
//!
//! Everything here is a pure function of its inputs. Nothing in this crate
//! touches the network; the RPC layer lives in the `chain` crate.

mod call;
mod error;
mod events;
pub mod extrinsic;
pub mod hashing;
pub mod storage;
mod types;

pub use call::Call;
pub use error::{ProtocolError, Result};
pub use events::{DispatchError, DispatchInfo, EventRecord, Phase, SystemEvent};
pub use extrinsic::{SignatureOptions, SignedExtrinsic};
pub use types::{AccountData, AccountInfo, AccountId32, Era, H256, MultiAddress, MultiSignature};

pub use parity_scale_codec::{Compact, Decode, Encode};
