//! # Stream — length-prefixed byte stream primitives
//!
//! The wire primitives used to persist row values: little-endian integers and
//! length-prefixed byte strings.
//!
//! ## Byte-string framing
//!
//! ```text
//! [len: u32 LE][payload: len bytes]
//! ```
//!
//! [`ByteWriter`] accumulates into an owned buffer; [`ByteReader`] walks a
//! borrowed slice and returns sub-slices without copying. A read past the end
//! of the buffer yields [`StreamError::Truncated`] — the caller decides
//! whether that is recoverable (it is not for checkpoint data, which is
//! trusted infrastructure).
//!
//! ## Example
//!
//! ```rust
//! use stream::{ByteReader, ByteWriter};
//!
//! let mut w = ByteWriter::new();
//! w.put_u64(42);
//! w.put_bytes(b"alice");
//! let buf = w.into_inner();
//!
//! let mut r = ByteReader::new(&buf);
//! assert_eq!(r.get_u64().unwrap(), 42);
//! assert_eq!(r.get_bytes().unwrap(), b"alice");
//! assert!(r.is_empty());
//! ```

use byteorder::{LittleEndian, WriteBytesExt};
use thiserror::Error;

/// Errors produced while decoding a byte stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The stream ended before the declared content did.
    #[error("truncated stream: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
}

/// Growable little-endian byte stream writer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u32(&mut self, v: u32) {
        // Writing into a Vec cannot fail.
        self.buf
            .write_u32::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf
            .write_u64::<LittleEndian>(v)
            .expect("vec write is infallible");
    }

    /// Appends a length-prefixed byte string: `[len: u32 LE][payload]`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than `u32::MAX` — nothing in the row
    /// format produces columns that large.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        let len = u32::try_from(bytes.len()).expect("byte string exceeds u32::MAX");
        self.put_u32(len);
        self.buf.extend_from_slice(bytes);
    }

    /// Appends raw bytes with no framing.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Zero-copy little-endian byte stream reader over a borrowed slice.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes left to consume.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], StreamError> {
        if needed > self.remaining() {
            return Err(StreamError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u32(&mut self) -> Result<u32, StreamError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }

    pub fn get_u64(&mut self) -> Result<u64, StreamError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8-byte slice")))
    }

    /// Reads a length-prefixed byte string, returning the payload as a
    /// borrowed sub-slice.
    pub fn get_bytes(&mut self) -> Result<&'a [u8], StreamError> {
        let len = self.get_u32()? as usize;
        self.take(len)
    }

    /// Reads exactly `len` raw bytes.
    pub fn get_raw(&mut self, len: usize) -> Result<&'a [u8], StreamError> {
        self.take(len)
    }
}

#[cfg(test)]
mod tests;
