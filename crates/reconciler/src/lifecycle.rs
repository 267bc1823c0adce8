//! Lifecycle operations over asset and activity records.
//!
//! Every state-changing operation follows the same shape: take the
//! per-asset lock, check preconditions against a fresh read, append an
//! activity row, settle the on-chain side, then flip the activity and
//! apply the asset mutation. When a step after the transaction fails, a
//! compensating `Failed` write keeps the activity log from claiming a
//! mutation that did not happen. A failed transaction is an outcome the
//! caller receives, not an error; precondition violations are errors and
//! write nothing.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use listener::{Listened, StatusListener};
use store::model::now_string;
use store::{
    ActivityKind, ActivityRecord, ActivityState, AssetRecord, LifecycleStatus, RecordStore,
    TokenStatus, DEFAULT_CHAIN, NULL,
};

use crate::error::{ReconcilerError, Result};
use crate::locks::AssetLockManager;
use crate::storage_status::{LifecycleSink, MockStoragePoll, StorageStatusPoll, STATE_ACTIVE};
use crate::submit::{SubmitTx, TxPayload};

/// What the caller gets back from a state-changing operation. `state` is
/// the terminal activity state, so a rejected transaction surfaces here
/// as `failed` rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReceipt {
    pub kind: String,
    pub from: String,
    pub to: String,
    pub price: String,
    pub state: String,
    pub date: String,
}

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub creator: String,
    pub name: String,
    pub content_hash: String,
    pub description: String,
    pub cover: String,
    pub length: String,
    pub label: String,
    pub size: i64,
}

#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    pub storage_status_url: String,
    pub mock_storage_status: bool,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            storage_status_url: "http://127.0.0.1:8081/status".into(),
            mock_storage_status: false,
        }
    }
}

pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    submit: Arc<dyn SubmitTx>,
    listener: Option<Arc<StatusListener>>,
    locks: Arc<AssetLockManager>,
    writer: Arc<LifecycleWriter>,
    http: reqwest::Client,
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RecordStore>,
        submit: Arc<dyn SubmitTx>,
        listener: Option<Arc<StatusListener>>,
        options: ReconcilerOptions,
    ) -> Self {
        let locks = Arc::new(AssetLockManager::new());
        let writer = Arc::new(LifecycleWriter {
            store: store.clone(),
            locks: locks.clone(),
        });
        Self {
            store,
            submit,
            listener,
            locks,
            writer,
            http: reqwest::Client::new(),
            options,
        }
    }

    /// Register a new asset. Writes the asset row, a storage-progress
    /// activity, hands the hash to the status poller and appends the
    /// creation activity.
    pub async fn create(&self, req: CreateRequest) -> Result<ActionReceipt> {
        if req.creator.is_empty()
            || req.name.is_empty()
            || req.content_hash.is_empty()
            || req.cover.is_empty()
            || req.size <= 0
        {
            return Err(precondition("there are empty asset file parameters"));
        }
        // A hash the poller cannot shard is rejected before anything is
        // written.
        if let Some(listener) = &self.listener {
            listener.validate_key(&req.content_hash)?;
        }
        let _guard = self.locks.acquire(&req.content_hash).await;
        if self.store.asset_exists(&req.content_hash).await? {
            return Err(precondition("asset metadata already exists"));
        }

        let asset = AssetRecord {
            name: req.name,
            content_hash: req.content_hash.clone(),
            description: req.description,
            cover: req.cover,
            length: req.length,
            views: 0,
            label: req.label,
            size: req.size,
            lifecycle: LifecycleStatus::Uploaded,
            creator: req.creator.clone(),
            owner: req.creator.clone(),
            token_id: NULL.into(),
            price: NULL.into(),
            tokenization: TokenStatus::Created,
            chain: DEFAULT_CHAIN.into(),
        };
        self.store.create_asset(asset).await?;

        let mut progress = new_activity(
            ActivityKind::FileProgress,
            &req.creator,
            NULL,
            LifecycleStatus::Uploaded.as_str(),
            &req.content_hash,
            NULL,
            NULL,
        );
        progress.state = ActivityState::Success;
        progress.completed_at = progress.started_at.clone();
        self.store.create_activity(progress).await?;

        self.track_storage(&req.content_hash);

        let mut created = new_activity(
            ActivityKind::Create,
            &req.creator,
            NULL,
            &req.creator,
            &req.content_hash,
            NULL,
            NULL,
        );
        created.state = ActivityState::Success;
        created.completed_at = created.started_at.clone();
        self.store.create_activity(created).await?;

        info!(hash = %req.content_hash, creator = %req.creator, "asset created");
        Ok(receipt(
            ActivityKind::Create,
            NULL,
            &req.creator,
            NULL,
            ActivityState::Success,
        ))
    }

    /// Mint the asset's token.
    pub async fn mint(&self, content_hash: &str, payload: TxPayload) -> Result<ActionReceipt> {
        let _guard = self.locks.acquire(content_hash).await;
        let asset = self.store.get_asset(content_hash).await?;
        if asset.tokenization != TokenStatus::Created {
            return Err(precondition("nft already minted"));
        }

        let mut activity = new_activity(
            ActivityKind::Mint,
            &asset.creator,
            NULL,
            &asset.creator,
            content_hash,
            content_hash,
            NULL,
        );
        activity.id = self.store.create_activity(activity.clone()).await?;

        let creator = asset.creator.clone();
        let state = self
            .settle(activity, asset, &payload, |a| {
                a.tokenization = TokenStatus::Minted;
                a.token_id = a.content_hash.clone();
            })
            .await?;
        Ok(receipt(ActivityKind::Mint, NULL, &creator, NULL, state))
    }

    /// Buy a listed token. Ownership moves to the buyer and the listing
    /// is cleared.
    pub async fn purchase(
        &self,
        buyer: &str,
        content_hash: &str,
        payload: TxPayload,
    ) -> Result<ActionReceipt> {
        let _guard = self.locks.acquire(content_hash).await;
        let asset = self.store.get_asset(content_hash).await?;
        if asset.tokenization != TokenStatus::Listed || !asset.has_price() {
            return Err(precondition("nft not list or price error"));
        }
        if buyer == asset.owner {
            return Err(precondition("unable to purchase your own asset"));
        }

        let mut activity = new_activity(
            ActivityKind::Purchase,
            buyer,
            &asset.owner,
            buyer,
            content_hash,
            &asset.token_id,
            &asset.price,
        );
        activity.id = self.store.create_activity(activity.clone()).await?;

        let seller = asset.owner.clone();
        let price = asset.price.clone();
        let buyer = buyer.to_string();
        let to = buyer.clone();
        let state = self
            .settle(activity, asset, &payload, move |a| {
                a.owner = buyer;
                a.tokenization = TokenStatus::Minted;
                a.price = NULL.into();
            })
            .await?;
        Ok(receipt(ActivityKind::Purchase, &seller, &to, &price, state))
    }

    /// Give a minted token to another owner without payment.
    pub async fn transfer(
        &self,
        content_hash: &str,
        to: &str,
        payload: TxPayload,
    ) -> Result<ActionReceipt> {
        let _guard = self.locks.acquire(content_hash).await;
        let asset = self.store.get_asset(content_hash).await?;
        if asset.tokenization != TokenStatus::Minted {
            return Err(precondition("nft is not mint state"));
        }
        if to == asset.owner {
            return Err(precondition("cannot transfer your asset to yourself"));
        }

        let mut activity = new_activity(
            ActivityKind::Transfer,
            &asset.owner,
            &asset.owner,
            to,
            content_hash,
            &asset.token_id,
            NULL,
        );
        activity.id = self.store.create_activity(activity.clone()).await?;

        let from = asset.owner.clone();
        let recipient = to.to_string();
        let to = to.to_string();
        let state = self
            .settle(activity, asset, &payload, move |a| {
                a.owner = recipient;
            })
            .await?;
        Ok(receipt(ActivityKind::Transfer, &from, &to, NULL, state))
    }

    /// List a minted token at `price`, or unlist a listed one.
    pub async fn change_status(
        &self,
        content_hash: &str,
        status: &str,
        price: Option<&str>,
        payload: TxPayload,
    ) -> Result<ActionReceipt> {
        let _guard = self.locks.acquire(content_hash).await;
        let asset = self.store.get_asset(content_hash).await?;

        let (target, new_price) = match status {
            "list" => {
                let price = price.unwrap_or_default();
                validate_price(price)?;
                match asset.tokenization {
                    TokenStatus::Listed => return Err(precondition("nft already list")),
                    TokenStatus::Minted => {}
                    _ => return Err(precondition("nft is not mint state")),
                }
                (TokenStatus::Listed, price.to_string())
            }
            "unlist" => {
                match asset.tokenization {
                    TokenStatus::Minted => return Err(precondition("nft already unlist")),
                    TokenStatus::Listed => {}
                    _ => return Err(precondition("nft is not mint state")),
                }
                (TokenStatus::Minted, NULL.to_string())
            }
            _ => return Err(precondition("status error")),
        };

        let mut activity = new_activity(
            ActivityKind::Alter,
            &asset.owner,
            asset.tokenization.as_str(),
            target.as_str(),
            content_hash,
            &asset.token_id,
            &new_price,
        );
        activity.id = self.store.create_activity(activity.clone()).await?;

        let from = asset.tokenization.as_str();
        let applied_price = new_price.clone();
        let state = self
            .settle(activity, asset, &payload, move |a| {
                a.tokenization = target;
                a.price = applied_price;
            })
            .await?;
        Ok(receipt(
            ActivityKind::Alter,
            from,
            target.as_str(),
            &new_price,
            state,
        ))
    }

    /// Reprice an existing listing.
    pub async fn change_price(
        &self,
        content_hash: &str,
        price: &str,
        payload: TxPayload,
    ) -> Result<ActionReceipt> {
        let _guard = self.locks.acquire(content_hash).await;
        let asset = self.store.get_asset(content_hash).await?;
        if asset.tokenization != TokenStatus::Listed {
            return Err(precondition("status error, nft not list"));
        }
        validate_price(price)?;
        if price == asset.price {
            return Err(precondition("price is the same as before"));
        }

        let mut activity = new_activity(
            ActivityKind::Alter,
            &asset.owner,
            &asset.price,
            price,
            content_hash,
            &asset.token_id,
            price,
        );
        activity.id = self.store.create_activity(activity.clone()).await?;

        let old_price = asset.price.clone();
        let new_price = price.to_string();
        let applied = new_price.clone();
        let state = self
            .settle(activity, asset, &payload, move |a| {
                a.price = applied;
            })
            .await?;
        Ok(receipt(
            ActivityKind::Alter,
            &old_price,
            &new_price,
            &new_price,
            state,
        ))
    }

    /// Mark an unminted asset's file as deleted. Purely off-chain.
    pub async fn delete(&self, content_hash: &str) -> Result<ActionReceipt> {
        let _guard = self.locks.acquire(content_hash).await;
        let mut asset = self.store.get_asset(content_hash).await?;
        if asset.tokenization != TokenStatus::Created {
            return Err(precondition("nft has been minted"));
        }
        let previous = asset.lifecycle;
        asset.lifecycle = LifecycleStatus::Deleted;
        self.store.update_asset(&asset).await?;

        let mut activity = new_activity(
            ActivityKind::FileProgress,
            &asset.owner,
            previous.as_str(),
            LifecycleStatus::Deleted.as_str(),
            content_hash,
            NULL,
            NULL,
        );
        activity.state = ActivityState::Success;
        activity.completed_at = activity.started_at.clone();
        self.store.create_activity(activity).await?;

        info!(hash = %content_hash, "asset deleted");
        Ok(receipt(
            ActivityKind::FileProgress,
            previous.as_str(),
            LifecycleStatus::Deleted.as_str(),
            NULL,
            ActivityState::Success,
        ))
    }

    /// Apply a storage state observed out-of-band (poller or manual).
    pub async fn update_lifecycle(&self, content_hash: &str, remote_state: &str) -> Result<()> {
        self.writer.apply(content_hash, remote_state).await
    }

    pub async fn asset(&self, content_hash: &str) -> Result<AssetRecord> {
        Ok(self.store.get_asset(content_hash).await?)
    }

    pub async fn asset_count(&self) -> Result<i64> {
        Ok(self.store.asset_count().await?)
    }

    pub async fn activities(&self, content_hash: &str) -> Result<Vec<ActivityRecord>> {
        Ok(self.store.activities_for(content_hash).await?)
    }

    pub async fn bump_views(&self, content_hash: &str) -> Result<i64> {
        Ok(self.store.bump_views(content_hash).await?)
    }

    /// Settle the on-chain side and flip the activity, applying `apply`
    /// to the asset only when the transaction landed. Returns the
    /// terminal activity state.
    async fn settle<F>(
        &self,
        mut activity: ActivityRecord,
        mut asset: AssetRecord,
        payload: &TxPayload,
        apply: F,
    ) -> Result<ActivityState>
    where
        F: FnOnce(&mut AssetRecord),
    {
        let outcome = match payload {
            TxPayload::Confirmed(hash) => Ok(hash.clone()),
            TxPayload::Signed(hex) => self.submit.submit_signed(hex).await,
        };
        let tx_hash = match outcome {
            Ok(hash) => hash,
            Err(e) => {
                warn!(hash = %activity.content_hash, kind = activity.kind.as_str(), "transaction failed: {e:#}");
                activity.state = ActivityState::Failed;
                activity.completed_at = now_string();
                self.store.update_activity(&activity).await?;
                return Ok(ActivityState::Failed);
            }
        };

        activity.tx_hash = tx_hash;
        activity.state = ActivityState::Success;
        activity.completed_at = now_string();
        self.store.update_activity(&activity).await?;

        apply(&mut asset);
        if let Err(e) = self.store.update_asset(&asset).await {
            error!(hash = %asset.content_hash, "asset write failed after confirmed transaction: {e}");
            activity.state = ActivityState::Failed;
            if let Err(e) = self.store.update_activity(&activity).await {
                error!(hash = %asset.content_hash, id = activity.id, "compensating activity write failed: {e}");
            }
            return Ok(ActivityState::Failed);
        }
        Ok(ActivityState::Success)
    }

    /// Hand the hash to the status poller. The asset is already durable
    /// at this point, so a saturated shard only costs the tracking; the
    /// record stays at its last known lifecycle.
    fn track_storage(&self, content_hash: &str) {
        let Some(listener) = &self.listener else {
            return;
        };
        let sink: Arc<dyn LifecycleSink> = self.writer.clone();
        let item: Box<dyn Listened> = if self.options.mock_storage_status {
            Box::new(MockStoragePoll::new(content_hash.to_string(), sink))
        } else {
            Box::new(StorageStatusPoll::new(
                content_hash.to_string(),
                self.options.storage_status_url.clone(),
                self.http.clone(),
                sink,
            ))
        };
        if let Err(e) = listener.enqueue(item) {
            warn!(hash = %content_hash, "storage tracking not started: {e}");
        }
    }
}

/// Applies poller-observed storage states to the records. Split out of
/// `Reconciler` so the poller items hold only this narrow handle.
struct LifecycleWriter {
    store: Arc<dyn RecordStore>,
    locks: Arc<AssetLockManager>,
}

impl LifecycleWriter {
    async fn apply(&self, content_hash: &str, remote_state: &str) -> Result<()> {
        // Anything the gateway reports short of `active` means the file
        // is still working its way through scheduling.
        let next = match remote_state {
            STATE_ACTIVE => LifecycleStatus::Stored,
            _ => LifecycleStatus::Scheduled,
        };
        let _guard = self.locks.acquire(content_hash).await;
        let mut asset = self.store.get_asset(content_hash).await?;
        if asset.lifecycle == next || asset.lifecycle == LifecycleStatus::Deleted {
            return Ok(());
        }
        let previous = asset.lifecycle;
        asset.lifecycle = next;
        self.store.update_asset(&asset).await?;

        let mut activity = new_activity(
            ActivityKind::FileProgress,
            &asset.creator,
            previous.as_str(),
            next.as_str(),
            content_hash,
            NULL,
            NULL,
        );
        activity.state = ActivityState::Success;
        activity.completed_at = activity.started_at.clone();
        self.store.create_activity(activity).await?;

        info!(hash = %content_hash, from = previous.as_str(), to = next.as_str(), "storage lifecycle advanced");
        Ok(())
    }
}

#[async_trait]
impl LifecycleSink for LifecycleWriter {
    async fn update_lifecycle(&self, content_hash: &str, remote_state: &str) {
        if let Err(e) = self.apply(content_hash, remote_state).await {
            warn!(hash = %content_hash, state = %remote_state, "lifecycle update failed: {e}");
        }
    }
}

fn precondition(message: &str) -> ReconcilerError {
    ReconcilerError::Precondition(message.to_string())
}

fn validate_price(price: &str) -> Result<()> {
    match price.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.is_finite() => Ok(()),
        _ => Err(precondition("invalid price")),
    }
}

fn new_activity(
    kind: ActivityKind,
    creator: &str,
    source: &str,
    target: &str,
    content_hash: &str,
    token_id: &str,
    price: &str,
) -> ActivityRecord {
    ActivityRecord {
        id: 0,
        kind,
        creator: creator.into(),
        source: source.into(),
        target: target.into(),
        content_hash: content_hash.into(),
        token_id: token_id.into(),
        price: price.into(),
        state: ActivityState::Listening,
        tx_hash: NULL.into(),
        gas: NULL.into(),
        started_at: now_string(),
        completed_at: String::new(),
    }
}

fn receipt(
    kind: ActivityKind,
    from: &str,
    to: &str,
    price: &str,
    state: ActivityState,
) -> ActionReceipt {
    ActionReceipt {
        kind: kind.as_str().into(),
        from: from.into(),
        to: to.into(),
        price: price.into(),
        state: state.as_str().into(),
        date: now_string(),
    }
}
