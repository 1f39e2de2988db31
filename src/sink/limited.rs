// Capacity-bounded writer
#![allow(dead_code)]

use crate::sink::error::SinkError;
use std::io::{self, Write};

/// Default per-stream output cap (10 KiB)
pub const DEFAULT_OUTPUT_LIMIT: u64 = 1024 * 10;

/// Writer that forwards at most `capacity` bytes downstream over its lifetime.
///
/// Writes that cross the cap are truncated to the remaining capacity, but the
/// caller is told the whole buffer was accepted, so the producer keeps going.
/// Once nothing remains every write fails with [`SinkError::Exhausted`].
#[derive(Debug)]
pub struct LimitedWriter<W> {
    inner: W,
    capacity: u64,
    remaining: u64,
}

impl<W: Write> LimitedWriter<W> {
    pub fn new(inner: W, capacity: u64) -> Self {
        Self {
            inner,
            capacity,
            remaining: capacity,
        }
    }

    /// Bytes that may still be forwarded
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Total bytes forwarded so far
    pub fn forwarded(&self) -> u64 {
        self.capacity - self.remaining
    }

    /// Whether the cap has been reached
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for LimitedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(SinkError::Exhausted {
                capacity: self.capacity,
            }
            .into());
        }

        let take = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let chunk = &buf[..take];

        // Charged up front: a failing downstream may have consumed part of the chunk
        self.remaining -= take as u64;
        self.inner.write_all(chunk)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::is_exhausted;

    #[test]
    fn test_write_under_capacity() {
        let mut w = LimitedWriter::new(Vec::new(), 16);
        assert_eq!(w.write(b"hello").unwrap(), 5);
        assert_eq!(w.remaining(), 11);
        assert_eq!(w.get_ref().as_slice(), b"hello");
    }

    #[test]
    fn test_oversized_write_is_truncated_but_accepted() {
        let mut w = LimitedWriter::new(Vec::new(), 4);
        assert_eq!(w.write(b"abcdefgh").unwrap(), 8);
        assert_eq!(w.get_ref().as_slice(), b"abcd");
        assert!(w.is_exhausted());
    }

    #[test]
    fn test_write_after_exhaustion_fails() {
        let mut w = LimitedWriter::new(Vec::new(), 3);
        w.write_all(b"abc").unwrap();

        let err = w.write(b"d").unwrap_err();
        assert!(is_exhausted(&err));
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
        assert_eq!(w.get_ref().len(), 3);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut w = LimitedWriter::new(Vec::new(), 0);
        assert!(w.write(b"x").is_err());
        assert!(w.get_ref().is_empty());
    }

    #[test]
    fn test_empty_write_does_not_consume() {
        let mut w = LimitedWriter::new(Vec::new(), 2);
        assert_eq!(w.write(b"").unwrap(), 0);
        assert_eq!(w.remaining(), 2);
    }

    #[test]
    fn test_downstream_failure_still_charges_capacity() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("down"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut w = LimitedWriter::new(Broken, 10);
        let err = w.write(b"abcd").unwrap_err();
        assert!(!is_exhausted(&err));
        assert_eq!(w.remaining(), 6);
    }
}
