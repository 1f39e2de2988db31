// Error types for Mux module

use thiserror::Error;

/// Mux errors
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode frame: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MuxError>;
