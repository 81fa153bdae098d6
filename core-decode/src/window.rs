//! # Input Window
//!
//! Fixed-capacity sliding window over the compressed input.
//!
//! ## Design
//!
//! - **Storage**: one contiguous allocation of `capacity + padding` bytes,
//!   made once. The padding stays zeroed for parsers that read past the end.
//! - **Live region**: `start..start + len`. Parsing shrinks it from the front.
//! - **Refill**: when fewer than `threshold` bytes remain, the live region is
//!   moved to offset 0 (overlapping move) and topped up from the source.
//! - **Exhaustion**: a read returning 0 bytes marks the source exhausted; the
//!   window then only drains.
//!
//! Invariant: `start + len <= capacity` at all times.

use crate::config::DecodeConfig;
use crate::error::{DecodeError, Result};
use crate::traits::{BitstreamParser, Parsed};
use std::io::{ErrorKind, Read};
use tracing::debug;

/// Streaming buffer manager for the compressed input.
pub struct InputWindow {
    buf: Vec<u8>,
    capacity: usize,
    threshold: usize,
    start: usize,
    len: usize,
    exhausted: bool,
    refills: u64,
    bytes_read: u64,
}

impl InputWindow {
    /// Allocate a window of `capacity` bytes plus `padding` bytes of zeroed
    /// lookahead space, refilled below `threshold` remaining bytes.
    pub fn new(capacity: usize, threshold: usize, padding: usize) -> Result<Self> {
        if capacity == 0 || threshold == 0 || threshold >= capacity {
            return Err(DecodeError::InvalidConfig(format!(
                "window capacity {} with refill threshold {}",
                capacity, threshold
            )));
        }

        Ok(Self {
            buf: vec![0; capacity + padding],
            capacity,
            threshold,
            start: 0,
            len: 0,
            exhausted: false,
            refills: 0,
            bytes_read: 0,
        })
    }

    pub fn from_config(config: &DecodeConfig) -> Result<Self> {
        Self::new(
            config.input_buffer_size,
            config.refill_threshold,
            config.input_padding,
        )
    }

    /// Unparsed bytes currently in the window.
    pub fn data(&self) -> &[u8] {
        &self.buf[self.start..self.start + self.len]
    }

    pub fn remaining(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` once a read has hit end of input.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Refill cycles performed so far, the initial fill included.
    pub fn refills(&self) -> u64 {
        self.refills
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Run the parser over the live region.
    ///
    /// Fails if the parser fails or claims to have consumed more bytes than
    /// the window holds.
    pub fn parse_next<'a, P: BitstreamParser + ?Sized>(
        &'a self,
        parser: &'a mut P,
    ) -> Result<Parsed<'a>> {
        let data = self.data();
        let parsed = parser.parse(data)?;

        if parsed.consumed > data.len() {
            return Err(DecodeError::Parse(format!(
                "parser consumed {} bytes of a {} byte window",
                parsed.consumed,
                data.len()
            )));
        }

        Ok(parsed)
    }

    /// Drop `consumed` bytes from the front of the window.
    pub fn advance(&mut self, consumed: usize) {
        let consumed = consumed.min(self.len);
        self.start += consumed;
        self.len -= consumed;
    }

    /// Discard everything left in the window, returning how much was dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.len;
        self.start = 0;
        self.len = 0;
        dropped
    }

    /// Returns `true` when fewer than `threshold` bytes remain.
    pub fn needs_refill(&self) -> bool {
        self.len < self.threshold
    }

    /// Compact the live region to offset 0 and top the window up from
    /// `source`.
    ///
    /// Returns the number of bytes read. Reads continue until the window is
    /// full or the source returns 0 bytes, which marks it exhausted.
    pub fn refill<R: Read + ?Sized>(&mut self, source: &mut R) -> Result<usize> {
        if self.start > 0 {
            self.buf.copy_within(self.start..self.start + self.len, 0);
            self.start = 0;
        }

        self.refills += 1;
        let mut read = 0;

        while !self.exhausted && self.len < self.capacity {
            match source.read(&mut self.buf[self.len..self.capacity]) {
                Ok(0) => self.exhausted = true,
                Ok(n) => {
                    self.len += n;
                    read += n;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(DecodeError::SourceError(format!(
                        "read failed after {} bytes: {}",
                        self.bytes_read + read as u64,
                        e
                    )))
                }
            }
        }

        self.bytes_read += read as u64;
        debug!(
            read,
            remaining = self.len,
            exhausted = self.exhausted,
            refill = self.refills,
            "Refilled input window"
        );

        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `chunk` bytes per call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_window_creation() {
        let window = InputWindow::new(16, 4, 8).unwrap();
        assert_eq!(window.capacity(), 16);
        assert!(window.is_empty());
        assert!(window.needs_refill());
        assert!(!window.is_exhausted());
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(InputWindow::new(0, 0, 0).is_err());
        assert!(InputWindow::new(16, 16, 0).is_err());
        assert!(InputWindow::new(16, 0, 0).is_err());
    }

    #[test]
    fn test_refill_tops_up_to_capacity() {
        let mut window = InputWindow::new(8, 4, 0).unwrap();
        let mut source = Cursor::new((0u8..20).collect::<Vec<_>>());

        assert_eq!(window.refill(&mut source).unwrap(), 8);
        assert_eq!(window.data(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(!window.is_exhausted());
    }

    #[test]
    fn test_compaction_preserves_unconsumed_bytes() {
        let mut window = InputWindow::new(8, 4, 0).unwrap();
        let mut source = Cursor::new((0u8..20).collect::<Vec<_>>());
        window.refill(&mut source).unwrap();

        window.advance(5);
        assert!(window.needs_refill());
        assert_eq!(window.refill(&mut source).unwrap(), 5);
        assert_eq!(window.data(), &[5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(window.bytes_read(), 13);
        assert_eq!(window.refills(), 2);
    }

    #[test]
    fn test_short_reads_are_accumulated() {
        let mut window = InputWindow::new(8, 4, 0).unwrap();
        let mut source = Trickle {
            data: (0u8..6).collect(),
            pos: 0,
            chunk: 2,
        };

        assert_eq!(window.refill(&mut source).unwrap(), 6);
        assert_eq!(window.data(), &[0, 1, 2, 3, 4, 5]);
        assert!(window.is_exhausted());
    }

    #[test]
    fn test_exhaustion_is_sticky() {
        let mut window = InputWindow::new(8, 4, 0).unwrap();
        let mut source = Cursor::new(vec![1u8, 2, 3]);

        assert_eq!(window.refill(&mut source).unwrap(), 3);
        assert!(window.is_exhausted());
        window.advance(1);
        assert_eq!(window.refill(&mut source).unwrap(), 0);
        assert_eq!(window.data(), &[2, 3]);
    }

    #[test]
    fn test_advance_and_discard() {
        let mut window = InputWindow::new(8, 4, 0).unwrap();
        window.refill(&mut Cursor::new(vec![9u8; 6])).unwrap();

        window.advance(2);
        assert_eq!(window.remaining(), 4);
        assert_eq!(window.discard(), 4);
        assert!(window.is_empty());

        window.refill(&mut Cursor::new(vec![1u8; 3])).unwrap();
        window.advance(100);
        assert!(window.is_empty());
    }

    #[test]
    fn test_full_window_reads_nothing() {
        let mut window = InputWindow::new(4, 2, 0).unwrap();
        let mut source = Cursor::new(vec![0u8; 16]);
        window.refill(&mut source).unwrap();

        assert_eq!(window.refill(&mut source).unwrap(), 0);
        assert!(!window.is_exhausted());
    }
}
