//! The node RPC surface the session depends on, and its WebSocket
//! implementation. The trait exists so the submitter can be exercised
//! against an in-process node double.

use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use protocol::hashing::{from_hex, to_hex};
use protocol::H256;

use crate::error::{ChainError, Result};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_version: u32,
    pub transaction_version: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub peers: u32,
    pub is_syncing: bool,
    pub should_have_peers: bool,
}

/// Inclusion status notifications for a submitted extrinsic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Future,
    Ready,
    Broadcast,
    InBlock(H256),
    Retracted(H256),
    FinalityTimeout(H256),
    Finalized(H256),
    Usurped(H256),
    Dropped,
    Invalid,
}

impl TxStatus {
    /// Parse the node's JSON notification. Plain strings carry no payload;
    /// single-key objects carry a block or transaction hash.
    pub fn from_value(value: &Value) -> Result<TxStatus> {
        if let Some(s) = value.as_str() {
            return match s {
                "future" => Ok(TxStatus::Future),
                "ready" => Ok(TxStatus::Ready),
                "dropped" => Ok(TxStatus::Dropped),
                "invalid" => Ok(TxStatus::Invalid),
                other => Err(ChainError::Decode(format!("unknown tx status {other:?}"))),
            };
        }
        let obj = value
            .as_object()
            .ok_or_else(|| ChainError::Decode(format!("unexpected tx status: {value}")))?;
        let (key, payload) = obj
            .iter()
            .next()
            .ok_or_else(|| ChainError::Decode("empty tx status object".into()))?;
        let hash = |v: &Value| -> Result<H256> {
            let s = v
                .as_str()
                .ok_or_else(|| ChainError::Decode(format!("non-string hash in {key}")))?;
            s.parse().map_err(|e| ChainError::Decode(format!("{e}")))
        };
        match key.as_str() {
            "broadcast" => Ok(TxStatus::Broadcast),
            "inBlock" => Ok(TxStatus::InBlock(hash(payload)?)),
            "retracted" => Ok(TxStatus::Retracted(hash(payload)?)),
            "finalityTimeout" => Ok(TxStatus::FinalityTimeout(hash(payload)?)),
            "finalized" => Ok(TxStatus::Finalized(hash(payload)?)),
            "usurped" => Ok(TxStatus::Usurped(hash(payload)?)),
            other => Err(ChainError::Decode(format!("unknown tx status {other:?}"))),
        }
    }
}

/// A live inclusion-status subscription. `release` must be called on every
/// exit path; dropping without it leaks the node-side subscription.
#[async_trait]
pub trait TxWatch: Send {
    async fn next_status(&mut self) -> Option<Result<TxStatus>>;
    async fn release(self: Box<Self>);
}

/// The node RPC surface used by the session and submitter.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn metadata_raw(&self) -> Result<Vec<u8>>;
    async fn block_hash(&self, number: u64) -> Result<H256>;
    async fn runtime_version(&self) -> Result<RuntimeVersion>;
    async fn health(&self) -> Result<Health>;
    async fn storage(&self, key: &[u8], at: Option<H256>) -> Result<Option<Vec<u8>>>;
    /// Wire bytes of every extrinsic in the block, in block order.
    async fn block_extrinsics(&self, at: H256) -> Result<Vec<Vec<u8>>>;
    async fn submit_and_watch(&self, ext: &[u8]) -> Result<Box<dyn TxWatch>>;
    /// Replace the underlying connection. Swap is atomic with respect to
    /// concurrent readers.
    async fn reconnect(&self) -> Result<()>;
}

/// jsonrpsee WebSocket transport.
pub struct WsNode {
    endpoint: String,
    client: RwLock<Arc<WsClient>>,
}

impl WsNode {
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let client = Self::dial(endpoint).await?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client: RwLock::new(Arc::new(client)),
        })
    }

    async fn dial(endpoint: &str) -> Result<WsClient> {
        WsClientBuilder::default()
            .build(endpoint)
            .await
            .map_err(|e| ChainError::Connection(format!("{endpoint}: {e}")))
    }

    async fn client(&self) -> Arc<WsClient> {
        self.client.read().await.clone()
    }
}

#[async_trait]
impl NodeRpc for WsNode {
    async fn metadata_raw(&self) -> Result<Vec<u8>> {
        let raw: String = self
            .client()
            .await
            .request("state_getMetadata", rpc_params![])
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(from_hex(&raw)?)
    }

    async fn block_hash(&self, number: u64) -> Result<H256> {
        let raw: String = self
            .client()
            .await
            .request("chain_getBlockHash", rpc_params![number])
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        raw.parse().map_err(|e| ChainError::Decode(format!("{e}")))
    }

    async fn runtime_version(&self) -> Result<RuntimeVersion> {
        self.client()
            .await
            .request("state_getRuntimeVersion", rpc_params![])
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn health(&self) -> Result<Health> {
        self.client()
            .await
            .request("system_health", rpc_params![])
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn storage(&self, key: &[u8], at: Option<H256>) -> Result<Option<Vec<u8>>> {
        let params = match at {
            Some(hash) => rpc_params![to_hex(key), hash.to_hex()],
            None => rpc_params![to_hex(key)],
        };
        let raw: Option<String> = self
            .client()
            .await
            .request("state_getStorage", params)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        match raw {
            Some(hex) => Ok(Some(from_hex(&hex)?)),
            None => Ok(None),
        }
    }

    async fn block_extrinsics(&self, at: H256) -> Result<Vec<Vec<u8>>> {
        let block: Value = self
            .client()
            .await
            .request("chain_getBlock", rpc_params![at.to_hex()])
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        let extrinsics = block
            .pointer("/block/extrinsics")
            .and_then(Value::as_array)
            .ok_or_else(|| ChainError::Decode("block response missing extrinsics".into()))?;
        extrinsics
            .iter()
            .map(|v| {
                let s = v
                    .as_str()
                    .ok_or_else(|| ChainError::Decode("non-string extrinsic in block".into()))?;
                Ok(from_hex(s)?)
            })
            .collect()
    }

    async fn submit_and_watch(&self, ext: &[u8]) -> Result<Box<dyn TxWatch>> {
        let sub: Subscription<Value> = self
            .client()
            .await
            .subscribe(
                "author_submitAndWatchExtrinsic",
                rpc_params![to_hex(ext)],
                "author_unwatchExtrinsic",
            )
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(Box::new(WsWatch { sub }))
    }

    async fn reconnect(&self) -> Result<()> {
        debug!("reconnecting to {}", self.endpoint);
        let fresh = Self::dial(&self.endpoint).await?;
        *self.client.write().await = Arc::new(fresh);
        Ok(())
    }
}

struct WsWatch {
    sub: Subscription<Value>,
}

#[async_trait]
impl TxWatch for WsWatch {
    async fn next_status(&mut self) -> Option<Result<TxStatus>> {
        let item = self.sub.next().await?;
        Some(
            item.map_err(|e| ChainError::Rpc(e.to_string()))
                .and_then(|v| TxStatus::from_value(&v)),
        )
    }

    async fn release(self: Box<Self>) {
        if let Err(e) = self.sub.unsubscribe().await {
            warn!("failed to unsubscribe extrinsic watch: {e}");
        }
    }
}
