//! Asset lifecycle reconciliation.
//!
//! Ties the other crates together: state-changing operations take a
//! per-asset lock, append an activity row, settle the on-chain side
//! through the `chain` crate, and hand off-chain storage tracking to the
//! `listener` crate. The record store behind it all is the `store` crate's
//! trait.

pub mod config;
mod error;
pub mod lifecycle;
pub mod locks;
pub mod runtime;
pub mod storage_status;
pub mod submit;

pub use config::Config;
pub use error::{ReconcilerError, Result};
pub use lifecycle::{ActionReceipt, CreateRequest, Reconciler, ReconcilerOptions};
pub use runtime::LedgerRuntime;
pub use storage_status::{LifecycleSink, MockStoragePoll, StorageStatusPoll};
pub use submit::{ChainSubmit, SubmitTx, TxPayload};
