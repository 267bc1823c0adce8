//! Pinned event model of the deployed runtime.
//!
//! Regenerated by hand on runtime upgrades: the enum must cover every
//! pallet index that emits events during the extrinsics this service
//! submits, or event decoding in the confirmation path fails. Pallets
//! whose events never appear in those blocks can be omitted.

use chain::{EventClass, RuntimeTarget};
use parity_scale_codec::Decode;
use protocol::{AccountId32, SystemEvent};

#[derive(Debug, Decode)]
pub enum LedgerEvent {
    #[codec(index = 0)]
    System(SystemEvent),
    #[codec(index = 6)]
    Balances(BalancesEvent),
    #[codec(index = 7)]
    TransactionPayment(TransactionPaymentEvent),
}

#[derive(Debug, Decode)]
pub enum BalancesEvent {
    Endowed {
        account: AccountId32,
        free_balance: u128,
    },
    DustLost {
        account: AccountId32,
        amount: u128,
    },
    Transfer {
        from: AccountId32,
        to: AccountId32,
        amount: u128,
    },
    BalanceSet {
        who: AccountId32,
        free: u128,
    },
    Reserved {
        who: AccountId32,
        amount: u128,
    },
    Unreserved {
        who: AccountId32,
        amount: u128,
    },
    ReserveRepatriated {
        from: AccountId32,
        to: AccountId32,
        amount: u128,
        destination_status: u8,
    },
    Deposit {
        who: AccountId32,
        amount: u128,
    },
    Withdraw {
        who: AccountId32,
        amount: u128,
    },
    Slashed {
        who: AccountId32,
        amount: u128,
    },
}

#[derive(Debug, Decode)]
pub enum TransactionPaymentEvent {
    TransactionFeePaid {
        who: AccountId32,
        actual_fee: u128,
        tip: u128,
    },
}

/// The deployment target handed to `chain::Submitter`.
pub struct LedgerRuntime;

impl RuntimeTarget for LedgerRuntime {
    type Event = LedgerEvent;

    fn classify(event: &Self::Event) -> EventClass {
        match event {
            LedgerEvent::System(SystemEvent::ExtrinsicSuccess(_)) => EventClass::ExtrinsicSuccess,
            LedgerEvent::System(SystemEvent::ExtrinsicFailed(error, _)) => {
                EventClass::ExtrinsicFailed(error.to_string())
            }
            _ => EventClass::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parity_scale_codec::{Compact, Encode};
    use protocol::{DispatchError, DispatchInfo, EventRecord, Phase};

    #[test]
    fn classifies_dispatch_outcomes() {
        let info = DispatchInfo {
            ref_time: Compact(1),
            proof_size: Compact(0),
            class: 0,
            pays_fee: 0,
        };
        let ok = LedgerEvent::System(SystemEvent::ExtrinsicSuccess(info));
        assert_eq!(LedgerRuntime::classify(&ok), EventClass::ExtrinsicSuccess);

        let failed = LedgerEvent::System(SystemEvent::ExtrinsicFailed(
            DispatchError::BadOrigin,
            info,
        ));
        assert!(matches!(
            LedgerRuntime::classify(&failed),
            EventClass::ExtrinsicFailed(_)
        ));

        let other = LedgerEvent::Balances(BalancesEvent::Deposit {
            who: AccountId32([1u8; 32]),
            amount: 10,
        });
        assert_eq!(LedgerRuntime::classify(&other), EventClass::Other);
    }

    #[test]
    fn decodes_records_with_balance_events() {
        // A success record followed by a fee event, as a transfer block
        // would carry them.
        let info = DispatchInfo {
            ref_time: Compact(1_000),
            proof_size: Compact(0),
            class: 0,
            pays_fee: 0,
        };
        let mut raw = Vec::new();
        Compact(2u32).encode_to(&mut raw);
        // Record 1: ApplyExtrinsic(0), TransactionPayment::TransactionFeePaid.
        Phase::ApplyExtrinsic(0).encode_to(&mut raw);
        raw.push(7); // pallet index
        raw.push(0); // variant index
        AccountId32([9u8; 32]).encode_to(&mut raw);
        1234u128.encode_to(&mut raw);
        0u128.encode_to(&mut raw);
        Vec::<protocol::H256>::new().encode_to(&mut raw);
        // Record 2: ApplyExtrinsic(0), System::ExtrinsicSuccess.
        Phase::ApplyExtrinsic(0).encode_to(&mut raw);
        raw.push(0);
        raw.push(0);
        info.encode_to(&mut raw);
        Vec::<protocol::H256>::new().encode_to(&mut raw);

        let decoded = Vec::<EventRecord<LedgerEvent>>::decode(&mut raw.as_slice()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(matches!(
            decoded[1].event,
            LedgerEvent::System(SystemEvent::ExtrinsicSuccess(_))
        ));
    }
}
