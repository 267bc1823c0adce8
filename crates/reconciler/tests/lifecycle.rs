//! End-to-end lifecycle flows over the in-memory store with a doubled
//! transaction submitter.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use listener::{ListenerConfig, StatusListener};
use reconciler::{CreateRequest, Reconciler, ReconcilerError, ReconcilerOptions, SubmitTx, TxPayload};
use store::{
    ActivityKind, ActivityState, LifecycleStatus, MemStore, RecordStore, StoreError, TokenStatus,
    NULL,
};

struct MockSubmit {
    fail: AtomicBool,
    calls: AtomicU32,
}

impl MockSubmit {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl SubmitTx for MockSubmit {
    async fn submit_signed(&self, _payload_hex: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("extrinsic rejected");
        }
        Ok("0xabc123".into())
    }
}

/// Store wrapper that can be made to reject asset updates, for the
/// compensation path.
struct FlakyStore {
    inner: MemStore,
    fail_asset_updates: AtomicBool,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn create_asset(&self, asset: store::AssetRecord) -> store::Result<()> {
        self.inner.create_asset(asset).await
    }
    async fn get_asset(&self, content_hash: &str) -> store::Result<store::AssetRecord> {
        self.inner.get_asset(content_hash).await
    }
    async fn update_asset(&self, asset: &store::AssetRecord) -> store::Result<()> {
        if self.fail_asset_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected".into()));
        }
        self.inner.update_asset(asset).await
    }
    async fn asset_exists(&self, content_hash: &str) -> store::Result<bool> {
        self.inner.asset_exists(content_hash).await
    }
    async fn asset_count(&self) -> store::Result<i64> {
        self.inner.asset_count().await
    }
    async fn delete_asset(&self, content_hash: &str) -> store::Result<()> {
        self.inner.delete_asset(content_hash).await
    }
    async fn bump_views(&self, content_hash: &str) -> store::Result<i64> {
        self.inner.bump_views(content_hash).await
    }
    async fn create_activity(&self, activity: store::ActivityRecord) -> store::Result<i64> {
        self.inner.create_activity(activity).await
    }
    async fn update_activity(&self, activity: &store::ActivityRecord) -> store::Result<()> {
        self.inner.update_activity(activity).await
    }
    async fn activities_for(
        &self,
        content_hash: &str,
    ) -> store::Result<Vec<store::ActivityRecord>> {
        self.inner.activities_for(content_hash).await
    }
    async fn latest_activity(
        &self,
        content_hash: &str,
        kind: ActivityKind,
    ) -> store::Result<Option<store::ActivityRecord>> {
        self.inner.latest_activity(content_hash, kind).await
    }
}

const HASH: &str = "a3f2c8d9e1b4567890abcdef12345678";

fn request() -> CreateRequest {
    CreateRequest {
        creator: "alice".into(),
        name: "clip.mp4".into(),
        content_hash: HASH.into(),
        description: "a clip".into(),
        cover: "cover.png".into(),
        length: "0:42".into(),
        label: "demo".into(),
        size: 1024,
    }
}

fn service_with(store: Arc<dyn RecordStore>, submit: Arc<MockSubmit>) -> Reconciler {
    Reconciler::new(store, submit, None, ReconcilerOptions::default())
}

fn service() -> (Reconciler, Arc<MemStore>, Arc<MockSubmit>) {
    let store = Arc::new(MemStore::new());
    let submit = MockSubmit::new();
    (
        service_with(store.clone(), submit.clone()),
        store,
        submit,
    )
}

fn precondition(err: ReconcilerError) -> String {
    match err {
        ReconcilerError::Precondition(message) => message,
        other => panic!("expected precondition, got {other}"),
    }
}

#[tokio::test]
async fn create_writes_asset_and_two_activities() {
    let (svc, store, _) = service();
    let receipt = svc.create(request()).await.unwrap();
    assert_eq!(receipt.kind, "create");
    assert_eq!(receipt.state, "success");
    assert_eq!(receipt.to, "alice");

    let asset = store.get_asset(HASH).await.unwrap();
    assert_eq!(asset.lifecycle, LifecycleStatus::Uploaded);
    assert_eq!(asset.tokenization, TokenStatus::Created);
    assert_eq!(asset.owner, "alice");
    assert_eq!(asset.price, NULL);
    assert_eq!(asset.token_id, NULL);

    let activities = store.activities_for(HASH).await.unwrap();
    assert_eq!(activities.len(), 2);
    assert_eq!(activities[0].kind, ActivityKind::FileProgress);
    assert_eq!(activities[0].target, "Upload");
    assert_eq!(activities[1].kind, ActivityKind::Create);
    assert!(activities
        .iter()
        .all(|a| a.state == ActivityState::Success));
}

#[tokio::test]
async fn create_rejects_duplicates_and_empty_fields() {
    let (svc, _, _) = service();
    svc.create(request()).await.unwrap();
    let err = svc.create(request()).await.unwrap_err();
    assert_eq!(precondition(err), "asset metadata already exists");

    let mut bad = request();
    bad.content_hash = "ffff0000ffff0000".into();
    bad.cover = String::new();
    let err = svc.create(bad).await.unwrap_err();
    assert_eq!(precondition(err), "there are empty asset file parameters");
}

#[tokio::test]
async fn mint_confirms_and_marks_minted() {
    let (svc, store, submit) = service();
    svc.create(request()).await.unwrap();

    let receipt = svc
        .mint(HASH, TxPayload::Signed("0xdeadbeef".into()))
        .await
        .unwrap();
    assert_eq!(receipt.kind, "mint");
    assert_eq!(receipt.state, "success");
    assert_eq!(submit.calls.load(Ordering::SeqCst), 1);

    let asset = store.get_asset(HASH).await.unwrap();
    assert_eq!(asset.tokenization, TokenStatus::Minted);
    assert_eq!(asset.token_id, HASH);

    let mint = store
        .latest_activity(HASH, ActivityKind::Mint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mint.state, ActivityState::Success);
    assert_eq!(mint.tx_hash, "0xabc123");
    assert!(!mint.completed_at.is_empty());
}

#[tokio::test]
async fn mint_is_rejected_once_minted() {
    let (svc, _, _) = service();
    svc.create(request()).await.unwrap();
    svc.mint(HASH, TxPayload::Confirmed("0xfeed".into()))
        .await
        .unwrap();
    let err = svc
        .mint(HASH, TxPayload::Confirmed("0xfeed".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "nft already minted");
}

#[tokio::test]
async fn rejected_transaction_is_an_outcome_not_an_error() {
    let (svc, store, submit) = service();
    svc.create(request()).await.unwrap();
    submit.fail.store(true, Ordering::SeqCst);

    let receipt = svc
        .mint(HASH, TxPayload::Signed("0xdeadbeef".into()))
        .await
        .unwrap();
    assert_eq!(receipt.state, "failed");

    // Asset untouched, activity terminal-failed.
    let asset = store.get_asset(HASH).await.unwrap();
    assert_eq!(asset.tokenization, TokenStatus::Created);
    let mint = store
        .latest_activity(HASH, ActivityKind::Mint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mint.state, ActivityState::Failed);
    assert_eq!(mint.tx_hash, NULL);
}

#[tokio::test]
async fn listing_requires_mint_first() {
    let (svc, store, _) = service();
    svc.create(request()).await.unwrap();

    let err = svc
        .change_status(HASH, "list", Some("10"), TxPayload::Confirmed("0x01".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "nft is not mint state");

    svc.mint(HASH, TxPayload::Confirmed("0x02".into()))
        .await
        .unwrap();
    let receipt = svc
        .change_status(HASH, "list", Some("10"), TxPayload::Confirmed("0x03".into()))
        .await
        .unwrap();
    assert_eq!(receipt.state, "success");
    assert_eq!(receipt.from, "Mint");
    assert_eq!(receipt.to, "List");

    let asset = store.get_asset(HASH).await.unwrap();
    assert_eq!(asset.tokenization, TokenStatus::Listed);
    assert_eq!(asset.price, "10");
}

#[tokio::test]
async fn listing_validates_status_and_price() {
    let (svc, _, _) = service();
    svc.create(request()).await.unwrap();
    svc.mint(HASH, TxPayload::Confirmed("0x01".into()))
        .await
        .unwrap();

    let err = svc
        .change_status(HASH, "burn", None, TxPayload::Confirmed("0x02".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "status error");

    let err = svc
        .change_status(HASH, "list", Some("-3"), TxPayload::Confirmed("0x02".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "invalid price");

    let err = svc
        .change_status(HASH, "unlist", None, TxPayload::Confirmed("0x02".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "nft already unlist");
}

#[tokio::test]
async fn purchase_moves_ownership_and_clears_listing() {
    let (svc, store, _) = service();
    svc.create(request()).await.unwrap();
    svc.mint(HASH, TxPayload::Confirmed("0x01".into()))
        .await
        .unwrap();
    svc.change_status(HASH, "list", Some("10"), TxPayload::Confirmed("0x02".into()))
        .await
        .unwrap();

    let err = svc
        .purchase("alice", HASH, TxPayload::Confirmed("0x03".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "unable to purchase your own asset");

    let receipt = svc
        .purchase("bob", HASH, TxPayload::Confirmed("0x03".into()))
        .await
        .unwrap();
    assert_eq!(receipt.kind, "tx");
    assert_eq!(receipt.from, "alice");
    assert_eq!(receipt.to, "bob");
    assert_eq!(receipt.price, "10");
    assert_eq!(receipt.state, "success");

    let asset = store.get_asset(HASH).await.unwrap();
    assert_eq!(asset.owner, "bob");
    assert_eq!(asset.creator, "alice");
    assert_eq!(asset.tokenization, TokenStatus::Minted);
    assert_eq!(asset.price, NULL);

    // No longer listed, so a second purchase has nothing to buy.
    let err = svc
        .purchase("carol", HASH, TxPayload::Confirmed("0x04".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "nft not list or price error");
}

#[tokio::test]
async fn transfer_requires_minted_and_distinct_owner() {
    let (svc, store, _) = service();
    svc.create(request()).await.unwrap();

    let err = svc
        .transfer(HASH, "bob", TxPayload::Confirmed("0x01".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "nft is not mint state");

    svc.mint(HASH, TxPayload::Confirmed("0x02".into()))
        .await
        .unwrap();
    let err = svc
        .transfer(HASH, "alice", TxPayload::Confirmed("0x03".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "cannot transfer your asset to yourself");

    let receipt = svc
        .transfer(HASH, "bob", TxPayload::Confirmed("0x03".into()))
        .await
        .unwrap();
    assert_eq!(receipt.kind, "ts");
    assert_eq!(receipt.state, "success");
    assert_eq!(store.get_asset(HASH).await.unwrap().owner, "bob");
}

#[tokio::test]
async fn change_price_only_reprices_live_listings() {
    let (svc, store, _) = service();
    svc.create(request()).await.unwrap();
    svc.mint(HASH, TxPayload::Confirmed("0x01".into()))
        .await
        .unwrap();

    let err = svc
        .change_price(HASH, "20", TxPayload::Confirmed("0x02".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "status error, nft not list");

    svc.change_status(HASH, "list", Some("10"), TxPayload::Confirmed("0x03".into()))
        .await
        .unwrap();

    let err = svc
        .change_price(HASH, "10", TxPayload::Confirmed("0x04".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "price is the same as before");

    let err = svc
        .change_price(HASH, "cheap", TxPayload::Confirmed("0x04".into()))
        .await
        .unwrap_err();
    assert_eq!(precondition(err), "invalid price");

    let receipt = svc
        .change_price(HASH, "20", TxPayload::Confirmed("0x04".into()))
        .await
        .unwrap();
    assert_eq!(receipt.state, "success");
    assert_eq!(store.get_asset(HASH).await.unwrap().price, "20");
}

#[tokio::test]
async fn confirmed_transaction_with_failed_asset_write_is_compensated() {
    let store = Arc::new(FlakyStore {
        inner: MemStore::new(),
        fail_asset_updates: AtomicBool::new(false),
    });
    let submit = MockSubmit::new();
    let svc = service_with(store.clone(), submit);
    svc.create(request()).await.unwrap();

    store.fail_asset_updates.store(true, Ordering::SeqCst);
    let receipt = svc
        .mint(HASH, TxPayload::Signed("0xdeadbeef".into()))
        .await
        .unwrap();
    assert_eq!(receipt.state, "failed");

    // The log must not claim a mutation that never landed.
    let mint = store
        .latest_activity(HASH, ActivityKind::Mint)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mint.state, ActivityState::Failed);
    assert_eq!(
        store.get_asset(HASH).await.unwrap().tokenization,
        TokenStatus::Created
    );
}

#[tokio::test]
async fn storage_states_advance_the_lifecycle() {
    let (svc, store, _) = service();
    svc.create(request()).await.unwrap();

    svc.update_lifecycle(HASH, "pending").await.unwrap();
    assert_eq!(
        store.get_asset(HASH).await.unwrap().lifecycle,
        LifecycleStatus::Scheduled
    );

    // Repeats change nothing; unrecognized states read as still scheduled.
    svc.update_lifecycle(HASH, "pending").await.unwrap();
    svc.update_lifecycle(HASH, "garbled").await.unwrap();

    svc.update_lifecycle(HASH, "active").await.unwrap();
    assert_eq!(
        store.get_asset(HASH).await.unwrap().lifecycle,
        LifecycleStatus::Stored
    );

    let progress: Vec<_> = store
        .activities_for(HASH)
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.kind == ActivityKind::FileProgress)
        .collect();
    // Upload at creation, then Schedule and Storage.
    assert_eq!(progress.len(), 3);
    assert_eq!(progress[1].source, "Upload");
    assert_eq!(progress[1].target, "Schedule");
    assert_eq!(progress[2].target, "Storage");
}

#[tokio::test]
async fn delete_is_limited_to_unminted_assets() {
    let (svc, store, _) = service();
    svc.create(request()).await.unwrap();

    let receipt = svc.delete(HASH).await.unwrap();
    assert_eq!(receipt.state, "success");
    assert_eq!(
        store.get_asset(HASH).await.unwrap().lifecycle,
        LifecycleStatus::Deleted
    );

    // Deleted records no longer follow storage states.
    svc.update_lifecycle(HASH, "active").await.unwrap();
    assert_eq!(
        store.get_asset(HASH).await.unwrap().lifecycle,
        LifecycleStatus::Deleted
    );

    let mut second = request();
    second.content_hash = "bbbb1111cccc2222".into();
    svc.create(second).await.unwrap();
    svc.mint("bbbb1111cccc2222", TxPayload::Confirmed("0x01".into()))
        .await
        .unwrap();
    let err = svc.delete("bbbb1111cccc2222").await.unwrap_err();
    assert_eq!(precondition(err), "nft has been minted");
}

#[tokio::test]
async fn unshardable_hash_is_rejected_before_any_write() {
    let store = Arc::new(MemStore::new());
    let listener = Arc::new(StatusListener::start(ListenerConfig::default()));
    let svc = Reconciler::new(
        store.clone(),
        MockSubmit::new(),
        Some(listener.clone()),
        ReconcilerOptions::default(),
    );

    let mut req = request();
    req.content_hash = "not-a-hex-hash".into();
    let err = svc.create(req).await.unwrap_err();
    assert!(matches!(err, ReconcilerError::Listener(_)), "got {err}");

    assert!(!store.asset_exists("not-a-hex-hash").await.unwrap());
    assert!(store
        .activities_for("not-a-hex-hash")
        .await
        .unwrap()
        .is_empty());
    listener.shutdown();
}

#[tokio::test]
async fn saturated_poller_does_not_fail_create() {
    let store = Arc::new(MemStore::new());
    // One slot, never swept: the second create cannot get a tracking slot.
    let listener = Arc::new(StatusListener::start(ListenerConfig {
        shard_bits: 0,
        queue_capacity: 1,
        sweep_interval: Duration::from_secs(3600),
        ..Default::default()
    }));
    let svc = Reconciler::new(
        store.clone(),
        MockSubmit::new(),
        Some(listener.clone()),
        ReconcilerOptions::default(),
    );

    svc.create(request()).await.unwrap();
    let mut second = request();
    second.content_hash = "bbbb1111cccc2222".into();
    let receipt = svc.create(second).await.unwrap();
    assert_eq!(receipt.state, "success");

    // Both creates are fully recorded despite the full shard.
    assert!(store.asset_exists("bbbb1111cccc2222").await.unwrap());
    assert_eq!(
        store.activities_for("bbbb1111cccc2222").await.unwrap().len(),
        2
    );
    listener.shutdown();
}

#[tokio::test]
async fn views_and_counts_pass_through() {
    let (svc, _, _) = service();
    svc.create(request()).await.unwrap();
    assert_eq!(svc.asset_count().await.unwrap(), 1);
    assert_eq!(svc.bump_views(HASH).await.unwrap(), 1);
    assert_eq!(svc.bump_views(HASH).await.unwrap(), 2);
    assert_eq!(svc.asset(HASH).await.unwrap().views, 2);
    assert_eq!(svc.activities(HASH).await.unwrap().len(), 2);
}
