//! Ledger session and extrinsic submission.
//!
//! `Session` owns the connection and chain constants, `Submitter` drives
//! the sign/submit/confirm loop, and `NodeRpc` is the transport seam the
//! tests double out.

mod error;
pub mod rpc;
mod runtime;
mod session;
mod submitter;

pub use error::{ChainError, Result};
pub use rpc::{Health, NodeRpc, RuntimeVersion, TxStatus, TxWatch, WsNode};
pub use runtime::{EventClass, RuntimeTarget};
pub use session::{RuntimeMetadata, Session};
pub use submitter::{Confirmed, SubmitConfig, Submitter};
