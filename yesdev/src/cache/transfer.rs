//! Destinations for reads and sources for writes.
//!
//! The cache never touches caller memory directly. Reads push chunks into a
//! [`ByteSink`] and writes pull bytes from a [`ByteSource`], so a glue layer
//! that copies across an address-space boundary can report a short transfer
//! instead of failing the whole call.

use bytes::BytesMut;

/// Destination for bytes produced by a read.
pub trait ByteSink {
    /// Accept a chunk, returning how many leading bytes were taken.
    ///
    /// Taking fewer than `chunk.len()` bytes is a fault and ends the read.
    fn accept(&mut self, chunk: &[u8]) -> usize;
}

impl ByteSink for Vec<u8> {
    fn accept(&mut self, chunk: &[u8]) -> usize {
        self.extend_from_slice(chunk);
        chunk.len()
    }
}

impl ByteSink for BytesMut {
    fn accept(&mut self, chunk: &[u8]) -> usize {
        self.extend_from_slice(chunk);
        chunk.len()
    }
}

/// Sink over a fixed caller buffer; refuses whatever does not fit.
#[derive(Debug)]
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    filled: usize,
}

impl<'a> SliceSink<'a> {
    /// Wrap a caller buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, filled: 0 }
    }

    /// Number of bytes written so far.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Space still available.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.filled
    }
}

impl ByteSink for SliceSink<'_> {
    fn accept(&mut self, chunk: &[u8]) -> usize {
        let n = chunk.len().min(self.remaining());
        self.buf[self.filled..self.filled + n].copy_from_slice(&chunk[..n]);
        self.filled += n;
        n
    }
}

/// Source of bytes consumed by a write.
pub trait ByteSource {
    /// Total number of bytes this source announces.
    fn remaining(&self) -> usize;

    /// Copy up to `dst.len()` bytes into `dst`, returning how many were copied.
    ///
    /// Returning 0 while bytes are still announced is a fault.
    fn supply(&mut self, dst: &mut [u8]) -> usize;
}

impl ByteSource for &[u8] {
    fn remaining(&self) -> usize {
        self.len()
    }

    fn supply(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.len());
        dst[..n].copy_from_slice(&self[..n]);
        *self = &self[n..];
        n
    }
}
