// Shared mixed-output destination and per-tag writers
#![allow(dead_code)]

use crate::mux::protocol::encode_frame;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Destination shared by every `TaggedWriter` of one execution.
///
/// Frames are encoded by the writer and then written here under the lock with
/// a single `write_all`, so two drain tasks can never interleave frame bytes.
#[derive(Debug)]
pub struct MixedStream<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for MixedStream<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> MixedStream<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Writer that frames everything written to it under `tag`
    pub fn writer(&self, tag: impl Into<String>) -> TaggedWriter<W> {
        TaggedWriter {
            stream: self.clone(),
            tag: tag.into(),
            pending: Vec::new(),
        }
    }

    /// Lock the destination, e.g. to read back an in-memory stream
    pub fn lock(&self) -> MutexGuard<'_, W> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_frame(&self, frame: &[u8]) -> io::Result<()> {
        self.lock().write_all(frame)
    }
}

/// Writer adapter that turns each write into one tagged frame.
///
/// A UTF-8 sequence cut at the end of a write is held back and prefixed to the
/// next one. Whatever is still held on `flush` or drop is emitted with
/// replacement characters.
///
/// Frames carry text, so bytes that can never form valid UTF-8 are replaced
/// with U+FFFD; `printf 'a\377b'` arrives as `"a\u{FFFD}b"`. Use a plain
/// sink when the exact bytes matter.
#[derive(Debug)]
pub struct TaggedWriter<W: Write> {
    stream: MixedStream<W>,
    tag: String,
    pending: Vec<u8>,
}

impl<W: Write> TaggedWriter<W> {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn emit(&mut self, data: &str) -> io::Result<()> {
        let frame = encode_frame(&self.tag, data).map_err(io::Error::other)?;
        self.stream.write_frame(&frame)
    }

    fn emit_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let data = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        self.emit(&data)
    }
}

impl<W: Write> Write for TaggedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.pending.extend_from_slice(buf);
        let split = self.pending.len() - incomplete_tail_len(&self.pending);
        if split > 0 {
            let data = String::from_utf8_lossy(&self.pending[..split]).into_owned();
            self.pending.drain(..split);
            self.emit(&data)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_pending()?;
        self.stream.lock().flush()
    }
}

impl<W: Write> Drop for TaggedWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.emit_pending() {
            warn!(tag = %self.tag, error = %e, "failed to emit trailing fragment");
        }
    }
}

/// Length of an unfinished UTF-8 sequence at the end of `buf`, or 0
fn incomplete_tail_len(buf: &[u8]) -> usize {
    for back in 1..=buf.len().min(3) {
        let b = buf[buf.len() - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let need = match b {
            0xF0..=0xF7 => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if need > back { back } else { 0 };
    }
    0
}
