//! The process-wide ledger session: connection handle, chain constants and
//! the signing key. Immutable after `connect` apart from the connection
//! itself, which the transport may swap on health-check failure.

use std::str::FromStr;
use std::sync::Arc;

use parity_scale_codec::Decode;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;
use tracing::{info, warn};

use protocol::{storage, AccountId32, AccountInfo, Era, H256, SignatureOptions};

use crate::error::{ChainError, Result};
use crate::rpc::{NodeRpc, RuntimeVersion, WsNode};

/// SCALE-encoded runtime metadata starts with this magic.
const METADATA_MAGIC: [u8; 4] = *b"meta";

/// Raw runtime metadata, validated but kept opaque. Storage keys in this
/// service are derived by hashing, not by metadata lookup.
#[derive(Clone, Debug)]
pub struct RuntimeMetadata {
    pub version: u8,
    pub raw: Vec<u8>,
}

impl RuntimeMetadata {
    fn parse(raw: Vec<u8>) -> Result<Self> {
        if raw.len() < 5 || raw[..4] != METADATA_MAGIC {
            return Err(ChainError::Decode("runtime metadata magic mismatch".into()));
        }
        Ok(Self {
            version: raw[4],
            raw,
        })
    }
}

pub struct Session {
    rpc: Arc<dyn NodeRpc>,
    metadata: RuntimeMetadata,
    genesis_hash: H256,
    runtime_version: RuntimeVersion,
    keypair: Option<Keypair>,
    network_id: u16,
    token_decimals: u32,
}

impl Session {
    /// Open a session over a WebSocket connection. Startup-blocking: any
    /// failed fetch aborts without retry; transient failures are only
    /// self-healed later through `is_healthy`.
    pub async fn connect(endpoint: &str, secret: &str, network_id: u16) -> Result<Self> {
        let rpc = Arc::new(WsNode::connect(endpoint).await?);
        Self::with_transport(rpc, secret, network_id).await
    }

    /// Open a session over an arbitrary transport (used by tests).
    pub async fn with_transport(
        rpc: Arc<dyn NodeRpc>,
        secret: &str,
        network_id: u16,
    ) -> Result<Self> {
        let metadata = RuntimeMetadata::parse(
            rpc.metadata_raw()
                .await
                .map_err(|e| ChainError::Connection(e.to_string()))?,
        )?;
        let genesis_hash = rpc
            .block_hash(0)
            .await
            .map_err(|e| ChainError::Connection(e.to_string()))?;
        let runtime_version = rpc
            .runtime_version()
            .await
            .map_err(|e| ChainError::Connection(e.to_string()))?;

        let keypair = if secret.is_empty() {
            None
        } else {
            let uri =
                SecretUri::from_str(secret).map_err(|e| ChainError::Signer(e.to_string()))?;
            Some(Keypair::from_uri(&uri).map_err(|e| ChainError::Signer(e.to_string()))?)
        };

        info!(
            genesis = %genesis_hash,
            spec_version = runtime_version.spec_version,
            metadata_version = metadata.version,
            "ledger session established"
        );

        Ok(Self {
            rpc,
            metadata,
            genesis_hash,
            runtime_version,
            keypair,
            network_id,
            token_decimals: 12,
        })
    }

    pub fn rpc(&self) -> &Arc<dyn NodeRpc> {
        &self.rpc
    }

    pub fn genesis_hash(&self) -> H256 {
        self.genesis_hash
    }

    pub fn metadata(&self) -> &RuntimeMetadata {
        &self.metadata
    }

    pub fn network_id(&self) -> u16 {
        self.network_id
    }

    pub fn token_decimals(&self) -> u32 {
        self.token_decimals
    }

    pub fn set_token_decimals(&mut self, decimals: u32) {
        self.token_decimals = decimals;
    }

    pub fn keypair(&self) -> Result<&Keypair> {
        self.keypair
            .as_ref()
            .ok_or_else(|| ChainError::Signer("session has no signing key".into()))
    }

    pub fn signer_account(&self) -> Result<AccountId32> {
        Ok(AccountId32(self.keypair()?.public_key().0))
    }

    /// Liveness probe. On failure, exactly one reconnect attempt with the
    /// stored endpoint, then a re-probe. Metadata, genesis hash and runtime
    /// version are assumed stable for the node's lifetime and are not
    /// refreshed here.
    pub async fn is_healthy(&self) -> bool {
        if self.rpc.health().await.is_ok() {
            return true;
        }
        warn!("health check failed, attempting reconnect");
        if let Err(e) = self.rpc.reconnect().await {
            warn!("reconnect failed: {e}");
            return false;
        }
        self.rpc.health().await.is_ok()
    }

    /// True while the node reports it is still syncing.
    pub async fn sync_status(&self) -> Result<bool> {
        Ok(self.rpc.health().await?.is_syncing)
    }

    /// On-chain nonce for `account`. `EmptyValue` means the account has no
    /// storage entry (never funded); callers apply the default-nonce policy.
    pub async fn account_nonce(&self, account: &AccountId32) -> Result<u64> {
        Ok(self.account_info(account).await?.nonce as u64)
    }

    pub async fn account_info(&self, account: &AccountId32) -> Result<AccountInfo> {
        let key = storage::system_account_key(account);
        let value = self
            .rpc
            .storage(&key, None)
            .await?
            .ok_or(ChainError::EmptyValue)?;
        Ok(AccountInfo::decode(&mut value.as_slice())
            .map_err(|e| ChainError::Decode(e.to_string()))?)
    }

    /// Bundle the constants every signature needs: genesis hash, an
    /// immortal era, the given nonce, zero tip and the session's runtime
    /// versions.
    pub fn signature_options(&self, nonce: u64) -> SignatureOptions {
        SignatureOptions {
            genesis_hash: self.genesis_hash,
            era: Era::Immortal,
            nonce,
            tip: 0,
            spec_version: self.runtime_version.spec_version,
            transaction_version: self.runtime_version.transaction_version,
        }
    }
}
