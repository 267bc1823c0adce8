//! Submission seam between lifecycle operations and the ledger.

use async_trait::async_trait;
use chain::{RuntimeTarget, Submitter};

/// How the caller settled the on-chain side of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxPayload {
    /// The transaction already happened elsewhere; this is its hash,
    /// recorded as given.
    Confirmed(String),
    /// A caller-signed extrinsic, 0x-prefixed hex of the SCALE wire
    /// bytes, to be submitted and confirmed now.
    Signed(String),
}

/// The live implementation drives `chain::Submitter`; tests substitute
/// their own.
#[async_trait]
pub trait SubmitTx: Send + Sync {
    /// Submit a caller-signed extrinsic and return its transaction hash
    /// once inclusion is confirmed without a failure event.
    async fn submit_signed(&self, payload_hex: &str) -> anyhow::Result<String>;
}

pub struct ChainSubmit<R: RuntimeTarget> {
    submitter: Submitter<R>,
}

impl<R: RuntimeTarget> ChainSubmit<R> {
    pub fn new(submitter: Submitter<R>) -> Self {
        Self { submitter }
    }

    pub fn submitter(&self) -> &Submitter<R> {
        &self.submitter
    }
}

#[async_trait]
impl<R: RuntimeTarget> SubmitTx for ChainSubmit<R> {
    async fn submit_signed(&self, payload_hex: &str) -> anyhow::Result<String> {
        let confirmed = self.submitter.submit_raw(payload_hex).await?;
        Ok(confirmed.tx_hash.to_string())
    }
}
