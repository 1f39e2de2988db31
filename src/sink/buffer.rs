// In-memory capture and fan-out writers
#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable in-memory byte buffer.
///
/// One clone is handed to a drain task as its sink while another stays with the
/// caller, who reads the captured bytes once the execution has finished.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the bytes written so far
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Captured bytes as text, invalid UTF-8 replaced
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that duplicates every write into two writers.
///
/// Both sides always see the whole buffer; the first error is returned after
/// the second writer has been given its copy.
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let first = self.first.write_all(buf);
        let second = self.second.write_all(buf);
        first.and(second)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let first = self.first.flush();
        let second = self.second.flush();
        first.and(second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_buffer_clones_share_storage() {
        let buf = SharedBuffer::new();
        let mut writer = buf.clone();
        writer.write_all(b"abc").unwrap();
        assert_eq!(buf.contents(), b"abc");
        assert_eq!(buf.to_string_lossy(), "abc");
    }

    #[test]
    fn test_tee_writes_both_sides() {
        let a = SharedBuffer::new();
        let b = SharedBuffer::new();
        let mut tee = Tee::new(a.clone(), b.clone());
        tee.write_all(b"one ").unwrap();
        tee.write_all(b"two").unwrap();
        assert_eq!(a.contents(), b"one two");
        assert_eq!(b.contents(), b"one two");
    }
}
