//! Durable record shapes: the mutable asset projection and the append-only
//! activity log.

use serde::{Deserialize, Serialize};

/// Sentinel for "no value" string fields (price, token id, actors).
pub const NULL: &str = "--";

pub const DEFAULT_CHAIN: &str = "CESS";

/// Off-chain storage lifecycle of the asset's media file. Driven
/// exclusively by the status poller, except `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleStatus {
    Uploaded,
    Scheduled,
    Stored,
    Deleted,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Uploaded => "Upload",
            LifecycleStatus::Scheduled => "Schedule",
            LifecycleStatus::Stored => "Storage",
            LifecycleStatus::Deleted => "Delete",
        }
    }
}

/// On-chain representation state of the asset. Only advances
/// `Created -> Minted -> {Listed <-> Minted} -> Melted`; melt is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
    Created,
    Minted,
    Listed,
    Melted,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Created => "Create",
            TokenStatus::Minted => "Mint",
            TokenStatus::Listed => "List",
            TokenStatus::Melted => "Melt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityState {
    Success,
    Failed,
    Listening,
    Withdrawn,
}

impl ActivityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityState::Success => "success",
            ActivityState::Failed => "failed",
            ActivityState::Listening => "listening",
            ActivityState::Withdrawn => "withdraw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    /// Asset record created.
    Create,
    /// Token minted.
    Mint,
    /// Token transferred to another owner.
    Transfer,
    /// Token purchased (paid transaction).
    Purchase,
    /// Listing/price alteration.
    Alter,
    /// File storage progress.
    FileProgress,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Create => "create",
            ActivityKind::Mint => "mint",
            ActivityKind::Transfer => "ts",
            ActivityKind::Purchase => "tx",
            ActivityKind::Alter => "alt",
            ActivityKind::FileProgress => "fpg",
        }
    }
}

/// Mutable asset projection, keyed by its immutable content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    pub content_hash: String,
    pub description: String,
    pub cover: String,
    pub length: String,
    pub views: i64,
    pub label: String,
    pub size: i64,
    pub lifecycle: LifecycleStatus,
    pub creator: String,
    pub owner: String,
    pub token_id: String,
    pub price: String,
    pub tokenization: TokenStatus,
    pub chain: String,
}

impl AssetRecord {
    pub fn has_price(&self) -> bool {
        self.price != NULL && !self.price.is_empty()
    }
}

/// One attempted action, append-only. The log is the audit source of
/// truth: it must never claim success for an asset mutation that did not
/// happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub kind: ActivityKind,
    pub creator: String,
    pub source: String,
    pub target: String,
    pub content_hash: String,
    pub token_id: String,
    pub price: String,
    pub state: ActivityState,
    pub tx_hash: String,
    pub gas: String,
    pub started_at: String,
    pub completed_at: String,
}

/// Timestamp format shared with the original records.
pub const TIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_string() -> String {
    chrono::Local::now().format(TIME_FMT).to_string()
}
