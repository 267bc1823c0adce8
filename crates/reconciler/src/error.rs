use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcilerError {
    /// The request fails a business precondition. Nothing was written;
    /// the message is safe to show to the caller.
    #[error("{0}")]
    Precondition(String),

    #[error("store: {0}")]
    Store(#[from] store::StoreError),

    #[error("listener: {0}")]
    Listener(#[from] listener::ListenerError),
}

pub type Result<T> = std::result::Result<T, ReconcilerError>;
