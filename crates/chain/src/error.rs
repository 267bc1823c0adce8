use thiserror::Error;

use protocol::H256;

#[derive(Error, Debug)]
pub enum ChainError {
    /// Startup-fatal: the node could not be reached or interrogated while
    /// opening the session. Never retried.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Transient RPC failure, retryable within bounded attempts.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The requested storage entry does not exist (e.g. a never-funded
    /// account has no `System.Account` record).
    #[error("empty storage value")]
    EmptyValue,

    /// The extrinsic landed in a block but its dispatch was rejected.
    /// Inclusion is not success.
    #[error("on-chain failure in block {block_hash}: {reason}")]
    OnChainFailure { block_hash: H256, reason: String },

    /// No terminal inclusion signal arrived in time. The transaction may
    /// still land later; callers must treat this as unknown, not failed.
    #[error("confirmation timeout after {0} seconds")]
    ConfirmationTimeout(u64),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("signer error: {0}")]
    Signer(String),
}

impl From<protocol::ProtocolError> for ChainError {
    fn from(e: protocol::ProtocolError) -> Self {
        ChainError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
