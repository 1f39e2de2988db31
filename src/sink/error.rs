// Error types for Sink module

use std::io;
use thiserror::Error;

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Output sink exhausted: capacity of {capacity} bytes reached")]
    Exhausted { capacity: u64 },
}

impl From<SinkError> for io::Error {
    fn from(e: SinkError) -> Self {
        io::Error::new(io::ErrorKind::WriteZero, e)
    }
}

/// Returns true if the io error was raised by an exhausted `LimitedWriter`
pub fn is_exhausted(err: &io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<SinkError>())
        .is_some_and(|e| matches!(e, SinkError::Exhausted { .. }))
}
