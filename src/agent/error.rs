// Agent errors

use crate::exec::ExecError;
use crate::mux::MuxError;
use thiserror::Error;

/// Agent errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Execution failed: {0}")]
    Exec(#[from] ExecError),

    #[error("Mixed output error: {0}")]
    Mux(#[from] MuxError),

    #[error("Invalid job description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input file name: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
