//! Build, sign, submit and confirm extrinsics.
//!
//! Submission-level failures (the node refuses the extrinsic outright) are
//! retried with an incremented nonce guess, a best-effort heuristic against
//! colliding with a transaction that was in fact accepted. Confirmation
//! waits on the inclusion subscription with an overall timeout; inclusion
//! alone is not success, only the absence of a failure event at the
//! extrinsic's own position in the block counts.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use parity_scale_codec::{Compact, Decode};
use tracing::{debug, error, info, warn};

use protocol::hashing::from_hex;
use protocol::{extrinsic, storage, Call, EventRecord, Phase, SignedExtrinsic, H256};

use crate::error::{ChainError, Result};
use crate::rpc::{TxStatus, TxWatch};
use crate::runtime::{EventClass, RuntimeTarget};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct SubmitConfig {
    /// Submission attempts before giving up (nonce bumped between tries).
    pub retry_count: u32,
    /// Delay between submission attempts.
    pub retry_delay: Duration,
    /// Overall confirmation wait once a subscription is live.
    pub confirm_timeout: Duration,
    /// Pallet/call indices for the balance transfer call.
    pub balances_pallet_index: u8,
    pub transfer_call_index: u8,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_delay: Duration::from_secs(3),
            confirm_timeout: Duration::from_secs(18),
            balances_pallet_index: 6,
            transfer_call_index: 0,
        }
    }
}

/// A confirmed inclusion: the block that carries the extrinsic and the
/// locally computed transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed {
    pub block_hash: H256,
    pub tx_hash: H256,
}

pub struct Submitter<R: RuntimeTarget> {
    session: Arc<Session>,
    config: SubmitConfig,
    _runtime: PhantomData<R>,
}

impl<R: RuntimeTarget> Submitter<R> {
    pub fn new(session: Arc<Session>, config: SubmitConfig) -> Self {
        Self {
            session,
            config,
            _runtime: PhantomData,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Sign `call` with a fresh nonce, submit it and wait for a classified
    /// outcome.
    pub async fn submit_and_confirm(&self, call: &Call) -> Result<Confirmed> {
        let signer = self.session.signer_account()?;
        // Policy: a never-funded account starts at nonce 0.
        let mut nonce = match self.session.account_nonce(&signer).await {
            Ok(n) => n,
            Err(ChainError::EmptyValue) => 0,
            Err(e) => return Err(e),
        };

        let mut last_err = None;
        for attempt in 0..self.config.retry_count {
            let options = self.session.signature_options(nonce);
            let ext = SignedExtrinsic::sign(call, &options, self.session.keypair()?)?;
            let wire = ext.encode();
            let tx_hash = ext.hash();
            debug!(%tx_hash, nonce, attempt, "submitting extrinsic");

            match self.session.rpc().submit_and_watch(&wire).await {
                Ok(watch) => return self.confirm(watch, &wire, tx_hash).await,
                Err(e) => {
                    warn!(nonce, attempt, "submission failed: {e}");
                    nonce += 1;
                    last_err = Some(e);
                    if attempt + 1 < self.config.retry_count {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ChainError::Rpc("no submission attempts made".into())))
    }

    /// Submit a caller-signed extrinsic. The payload wire format is fixed:
    /// 0x-prefixed hex of the SCALE-encoded signed extrinsic.
    pub async fn submit_raw(&self, payload_hex: &str) -> Result<Confirmed> {
        let wire = from_hex(payload_hex)
            .map_err(|e| ChainError::Decode(format!("signed payload is not hex: {e}")))?;
        if wire.is_empty() {
            return Err(ChainError::Decode("signed payload is empty".into()));
        }
        let tx_hash = extrinsic::hash_encoded(&wire);
        let watch = self.session.rpc().submit_and_watch(&wire).await?;
        self.confirm(watch, &wire, tx_hash).await
    }

    /// Transfer `amount` base units to `dest` through the balances pallet.
    pub async fn transfer(&self, dest: protocol::AccountId32, amount: u128) -> Result<Confirmed> {
        let call = Call::new(
            self.config.balances_pallet_index,
            self.config.transfer_call_index,
        )
        .arg(protocol::MultiAddress::Id(dest))
        .arg(Compact(amount));
        let confirmed = self.submit_and_confirm(&call).await?;
        info!(block = %confirmed.block_hash, tx = %confirmed.tx_hash, "transfer confirmed");
        Ok(confirmed)
    }

    /// Drive the subscription to a terminal classification. The watch is
    /// released on every exit path.
    async fn confirm(
        &self,
        mut watch: Box<dyn TxWatch>,
        wire: &[u8],
        tx_hash: H256,
    ) -> Result<Confirmed> {
        let wait = self.config.confirm_timeout;
        let outcome = tokio::time::timeout(wait, self.wait_for_outcome(&mut watch, wire, tx_hash))
            .await
            .unwrap_or(Err(ChainError::ConfirmationTimeout(wait.as_secs())));
        watch.release().await;
        outcome
    }

    async fn wait_for_outcome(
        &self,
        watch: &mut Box<dyn TxWatch>,
        wire: &[u8],
        tx_hash: H256,
    ) -> Result<Confirmed> {
        loop {
            let status = match watch.next_status().await {
                Some(Ok(status)) => status,
                Some(Err(e)) => return Err(e),
                None => return Err(ChainError::Rpc("status subscription closed".into())),
            };
            match status {
                TxStatus::InBlock(block_hash) => {
                    debug!(%tx_hash, block = %block_hash, "extrinsic in block");
                    match self.classify_in_block(block_hash, wire).await? {
                        Some(reason) => {
                            error!(%tx_hash, block = %block_hash, "on-chain failure: {reason}");
                            return Err(ChainError::OnChainFailure { block_hash, reason });
                        }
                        None => {
                            info!(%tx_hash, block = %block_hash, "extrinsic confirmed");
                            return Ok(Confirmed {
                                block_hash,
                                tx_hash,
                            });
                        }
                    }
                }
                TxStatus::Dropped | TxStatus::Invalid => {
                    return Err(ChainError::Rpc(format!("extrinsic rejected: {status:?}")));
                }
                TxStatus::Usurped(_) => {
                    return Err(ChainError::Rpc("extrinsic usurped by another".into()));
                }
                // Non-terminal notifications; keep waiting.
                TxStatus::Future
                | TxStatus::Ready
                | TxStatus::Broadcast
                | TxStatus::Retracted(_)
                | TxStatus::FinalityTimeout(_)
                | TxStatus::Finalized(_) => continue,
            }
        }
    }

    /// Scan the block's events scoped to this extrinsic's position.
    /// `Some(reason)` means a failure event was found; `None` means the
    /// extrinsic succeeded.
    async fn classify_in_block(&self, block_hash: H256, wire: &[u8]) -> Result<Option<String>> {
        let extrinsics = self.session.rpc().block_extrinsics(block_hash).await?;
        let index = extrinsics
            .iter()
            .position(|bytes| bytes == wire)
            .ok_or_else(|| {
                ChainError::Decode(format!("extrinsic not found in block {block_hash}"))
            })? as u32;

        let raw = self
            .session
            .rpc()
            .storage(&storage::system_events_key(), Some(block_hash))
            .await?
            .ok_or(ChainError::EmptyValue)?;
        let records = Vec::<EventRecord<R::Event>>::decode(&mut raw.as_slice())
            .map_err(|e| ChainError::Decode(format!("event records: {e}")))?;

        let mut saw_success = false;
        for record in &records {
            if record.phase != Phase::ApplyExtrinsic(index) {
                continue;
            }
            match R::classify(&record.event) {
                EventClass::ExtrinsicFailed(reason) => return Ok(Some(reason)),
                EventClass::ExtrinsicSuccess => saw_success = true,
                EventClass::Other => {}
            }
        }
        if saw_success {
            Ok(None)
        } else {
            Err(ChainError::Decode(format!(
                "no dispatch outcome for extrinsic {index} in block {block_hash}"
            )))
        }
    }
}
