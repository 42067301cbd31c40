//! Wire stream primitives.
//!
//! Transport payloads are encoded with a variable-length integer format:
//! seven payload bits per byte, least-significant group first, high bit set
//! on every byte except the last. Length-prefixed byte references reuse the
//! same format for the length and let old peers skip fields they do not
//! know.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::version::Version;

/// Errors raised by the wire codec.
#[derive(Debug, Error)]
pub enum WireError {
    /// The stream ended before a complete value could be read.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A variable-length integer did not fit in 32 bits.
    #[error("invalid variable-length integer")]
    InvalidVint,

    /// I/O error from the underlying channel.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A consuming reader over a received payload.
///
/// Carries the wire version the enclosing frame was decoded with, which the
/// handshake receive path consults to pick its response version.
#[derive(Debug)]
pub struct WireInput {
    buf: Bytes,
    version: Version,
}

impl WireInput {
    /// Wrap a payload decoded at `version`.
    pub fn new(buf: Bytes, version: Version) -> Self {
        Self { buf, version }
    }

    /// The wire version the enclosing frame was decoded with.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        if self.buf.is_empty() {
            return Err(WireError::UnexpectedEof);
        }
        Ok(self.buf.get_u8())
    }

    /// Read a variable-length 32-bit integer.
    pub fn read_vint(&mut self) -> Result<u32, WireError> {
        let mut value = 0u32;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift == 28 {
                // Last byte of a 32-bit vint: at most four payload bits,
                // no continuation.
                if byte & 0xf0 != 0 {
                    return Err(WireError::InvalidVint);
                }
                return Ok(value | ((byte as u32) << shift));
            }
            value |= ((byte & 0x7f) as u32) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Read a length-prefixed byte reference.
    pub fn read_bytes_ref(&mut self) -> Result<Bytes, WireError> {
        let len = self.read_vint()? as usize;
        if self.buf.len() < len {
            return Err(WireError::UnexpectedEof);
        }
        Ok(self.buf.split_to(len))
    }

    /// Read a length-prefixed byte reference, treating end-of-stream at any
    /// point of the read as the field being absent.
    ///
    /// This is the receive side of the forward-compatibility contract: a
    /// peer too old to know the field simply does not send it.
    pub fn read_optional_bytes_ref(&mut self) -> Result<Option<Bytes>, WireError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let len = match self.read_vint() {
            Ok(len) => len as usize,
            Err(WireError::UnexpectedEof) => return Ok(None),
            Err(e) => return Err(e),
        };
        if self.buf.len() < len {
            return Ok(None);
        }
        Ok(Some(self.buf.split_to(len)))
    }

    /// Open a bounded reader over a nested blob, inheriting this stream's
    /// wire version.
    pub fn sub_input(&self, blob: Bytes) -> WireInput {
        WireInput::new(blob, self.version)
    }
}

/// A growable writer for outbound payloads.
#[derive(Debug, Default)]
pub struct WireOutput {
    buf: BytesMut,
}

impl WireOutput {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Create a writer with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, byte: u8) {
        self.buf.put_u8(byte);
    }

    /// Write a variable-length 32-bit integer.
    pub fn write_vint(&mut self, mut value: u32) {
        while value & !0x7f != 0 {
            self.buf.put_u8((value & 0x7f) as u8 | 0x80);
            value >>= 7;
        }
        self.buf.put_u8(value as u8);
    }

    /// Write a length-prefixed byte reference.
    pub fn write_bytes_ref(&mut self, bytes: &[u8]) {
        self.write_vint(bytes.len() as u32);
        self.buf.put_slice(bytes);
    }

    /// Bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze the accumulated bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(bytes: &[u8]) -> WireInput {
        WireInput::new(Bytes::copy_from_slice(bytes), Version::V_1_0_0)
    }

    #[test]
    fn test_vint_round_trip() {
        for value in [0u32, 1, 127, 128, 300, 16_383, 16_384, 6_079_999, u32::MAX] {
            let mut out = WireOutput::new();
            out.write_vint(value);
            let mut inp = input(out.as_slice());
            assert_eq!(inp.read_vint().unwrap(), value);
            assert_eq!(inp.remaining(), 0);
        }
    }

    #[test]
    fn test_vint_small_values_are_one_byte() {
        let mut out = WireOutput::new();
        out.write_vint(127);
        assert_eq!(out.len(), 1);
        out.write_vint(128);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_vint_truncated() {
        let mut inp = input(&[0x80, 0x80]);
        assert!(matches!(inp.read_vint(), Err(WireError::UnexpectedEof)));
    }

    #[test]
    fn test_vint_overflow_rejected() {
        // Fifth byte with payload bits above bit 31
        let mut inp = input(&[0x80, 0x80, 0x80, 0x80, 0x10]);
        assert!(matches!(inp.read_vint(), Err(WireError::InvalidVint)));

        // Continuation bit on the fifth byte
        let mut inp = input(&[0x80, 0x80, 0x80, 0x80, 0x80]);
        assert!(matches!(inp.read_vint(), Err(WireError::InvalidVint)));
    }

    #[test]
    fn test_bytes_ref_round_trip() {
        let mut out = WireOutput::new();
        out.write_bytes_ref(b"handshake");
        out.write_u8(0x2a);

        let mut inp = input(out.as_slice());
        assert_eq!(inp.read_bytes_ref().unwrap().as_ref(), b"handshake");
        assert_eq!(inp.read_u8().unwrap(), 0x2a);
        assert_eq!(inp.remaining(), 0);
    }

    #[test]
    fn test_bytes_ref_truncated_body() {
        let mut out = WireOutput::new();
        out.write_vint(10);
        out.write_u8(0x01);

        let mut inp = input(out.as_slice());
        assert!(matches!(inp.read_bytes_ref(), Err(WireError::UnexpectedEof)));
    }

    #[test]
    fn test_optional_bytes_ref_absent() {
        let mut inp = input(&[]);
        assert!(inp.read_optional_bytes_ref().unwrap().is_none());

        // Truncated body reads as absent, not as an error
        let mut out = WireOutput::new();
        out.write_vint(10);
        let mut inp = input(out.as_slice());
        assert!(inp.read_optional_bytes_ref().unwrap().is_none());
    }

    #[test]
    fn test_optional_bytes_ref_zero_length() {
        let mut out = WireOutput::new();
        out.write_bytes_ref(&[]);
        let mut inp = input(out.as_slice());
        let blob = inp.read_optional_bytes_ref().unwrap().unwrap();
        assert!(blob.is_empty());
    }

    #[test]
    fn test_sub_input_inherits_version() {
        let inp = WireInput::new(Bytes::new(), Version::LEGACY_6_8_0);
        let sub = inp.sub_input(Bytes::from_static(b"\x01"));
        assert_eq!(sub.version(), Version::LEGACY_6_8_0);
    }
}
