//! Block event decoding. The `System.Events` storage value is a SCALE
//! vector of `EventRecord`s; the runtime-specific event enum is supplied by
//! the deployment (see the `chain` crate's `RuntimeTarget`), this module
//! only fixes the record framing and the system pallet's own events.

use std::fmt;

use parity_scale_codec::{Compact, Decode, Encode};

use crate::types::{AccountId32, H256};

/// Which execution phase an event was emitted in. Events carrying
/// `ApplyExtrinsic(i)` belong to the extrinsic at index `i` in the block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Phase {
    #[codec(index = 0)]
    ApplyExtrinsic(u32),
    #[codec(index = 1)]
    Finalization,
    #[codec(index = 2)]
    Initialization,
}

/// One emitted event, scoped to its phase.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct EventRecord<E> {
    pub phase: Phase,
    pub event: E,
    pub topics: Vec<H256>,
}

/// Weight and fee class attached to a dispatched extrinsic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub struct DispatchInfo {
    pub ref_time: Compact<u64>,
    pub proof_size: Compact<u64>,
    pub class: u8,
    pub pays_fee: u8,
}

/// Why a dispatched extrinsic was rejected despite block inclusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode)]
pub enum DispatchError {
    #[codec(index = 0)]
    Other,
    #[codec(index = 1)]
    CannotLookup,
    #[codec(index = 2)]
    BadOrigin,
    #[codec(index = 3)]
    Module { index: u8, error: [u8; 4] },
    #[codec(index = 4)]
    ConsumerRemaining,
    #[codec(index = 5)]
    NoProviders,
    #[codec(index = 6)]
    TooManyConsumers,
    #[codec(index = 7)]
    Token(u8),
    #[codec(index = 8)]
    Arithmetic(u8),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Module { index, error } => {
                write!(f, "module error (pallet {index}, error {:?})", error)
            }
            other => write!(f, "{other:?}"),
        }
    }
}

/// The system pallet's events. Only the outcome markers matter to the
/// submitter; the account events ride along to keep the variant space
/// aligned with the runtime.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum SystemEvent {
    #[codec(index = 0)]
    ExtrinsicSuccess(DispatchInfo),
    #[codec(index = 1)]
    ExtrinsicFailed(DispatchError, DispatchInfo),
    #[codec(index = 2)]
    CodeUpdated,
    #[codec(index = 3)]
    NewAccount(AccountId32),
    #[codec(index = 4)]
    KilledAccount(AccountId32),
    #[codec(index = 5)]
    Remarked(AccountId32, H256),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success_info() -> DispatchInfo {
        DispatchInfo {
            ref_time: Compact(1_000),
            proof_size: Compact(0),
            class: 0,
            pays_fee: 0,
        }
    }

    #[test]
    fn event_records_round_trip() {
        let records = vec![
            EventRecord {
                phase: Phase::ApplyExtrinsic(0),
                event: SystemEvent::ExtrinsicSuccess(success_info()),
                topics: vec![],
            },
            EventRecord {
                phase: Phase::ApplyExtrinsic(1),
                event: SystemEvent::ExtrinsicFailed(
                    DispatchError::Module {
                        index: 6,
                        error: [2, 0, 0, 0],
                    },
                    success_info(),
                ),
                topics: vec![],
            },
        ];
        let bytes = records.encode();
        let decoded = Vec::<EventRecord<SystemEvent>>::decode(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn phase_index_is_stable() {
        assert_eq!(Phase::ApplyExtrinsic(3).encode(), vec![0, 3, 0, 0, 0]);
        assert_eq!(Phase::Finalization.encode(), vec![1]);
    }
}
