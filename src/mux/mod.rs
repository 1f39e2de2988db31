// Mux module - tagged multiplexing of several output streams onto one
// Frames are MessagePack maps {"t": tag, "d": data}, written back to back
#![allow(unused_imports)]

pub mod error;
pub mod protocol;
pub mod stream;
pub mod types;

pub use error::{MuxError, Result};
pub use protocol::{FrameReader, decode_messages, encode_frame, group_by_tag};
pub use stream::{MixedStream, TaggedWriter};
pub use types::Message;
