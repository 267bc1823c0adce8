use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },

    #[error("signer error: {0}")]
    Signer(String),
}

impl From<parity_scale_codec::Error> for ProtocolError {
    fn from(e: parity_scale_codec::Error) -> Self {
        ProtocolError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
