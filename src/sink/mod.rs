// Sink module - bounded and shared output writers
#![allow(unused_imports)]

pub mod buffer;
pub mod error;
pub mod limited;

pub use buffer::{SharedBuffer, Tee};
pub use error::{SinkError, is_exhausted};
pub use limited::{DEFAULT_OUTPUT_LIMIT, LimitedWriter};
