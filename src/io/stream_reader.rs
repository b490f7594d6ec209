//! Forward-only byte cursor over the (possibly decompressed) DMF stream.
//!
//! Every structural reader in the pipeline checks its byte consumption
//! against a declared record size, so the cursor tracks an absolute
//! position and never seeks. Skipping is reading: the underlying source
//! may be a decompressor that cannot seek at all.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::Encoding;

use crate::error::{DmfError, Result};
use crate::io::extended::{decode_extended, EXTENDED_SIZE};

/// Byte cursor with position tracking and legacy text decoding.
pub struct StreamReader<R: Read> {
    inner: R,
    position: u64,
    encoding: &'static Encoding,
}

impl<R: Read> StreamReader<R> {
    /// Wrap a stream, decoding text as windows-1251 (the producing
    /// system's platform default).
    pub fn new(inner: R) -> Self {
        Self::with_encoding(inner, encoding_rs::WINDOWS_1251)
    }

    /// Wrap a stream with an explicit single-byte legacy encoding.
    pub fn with_encoding(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            position: 0,
            encoding,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The legacy text encoding this cursor decodes strings with.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    fn truncated(&self, err: std::io::Error) -> DmfError {
        DmfError::from_read(err, &format!("unexpected end of stream at byte {}", self.position))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.inner.read_u8().map_err(|e| self.truncated(e))?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let value = self
            .inner
            .read_u16::<LittleEndian>()
            .map_err(|e| self.truncated(e))?;
        self.position += 2;
        Ok(value)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self
            .inner
            .read_i32::<LittleEndian>()
            .map_err(|e| self.truncated(e))?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self
            .inner
            .read_u32::<LittleEndian>()
            .map_err(|e| self.truncated(e))?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let value = self
            .inner
            .read_f32::<LittleEndian>()
            .map_err(|e| self.truncated(e))?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; length];
        self.inner
            .read_exact(&mut buffer)
            .map_err(|e| self.truncated(e))?;
        self.position += length as u64;
        Ok(buffer)
    }

    /// Consume and discard `length` bytes.
    pub fn skip(&mut self, length: u64) -> Result<()> {
        let skipped = std::io::copy(
            &mut self.inner.by_ref().take(length),
            &mut std::io::sink(),
        )?;
        self.position += skipped;
        if skipped < length {
            return Err(DmfError::TruncatedInput(format!(
                "unexpected end of stream at byte {}",
                self.position
            )));
        }
        Ok(())
    }

    /// Read a 10-byte extended-precision real.
    pub fn read_extended(&mut self) -> Result<f64> {
        let mut buffer = [0u8; EXTENDED_SIZE];
        self.inner
            .read_exact(&mut buffer)
            .map_err(|e| self.truncated(e))?;
        self.position += EXTENDED_SIZE as u64;
        decode_extended(&buffer)
    }

    /// Read a length-prefixed short string.
    ///
    /// One length byte, then that many text bytes in the stream encoding.
    /// When the field is fixed-width, `max_length` names the field width
    /// and the `max_length - length` padding bytes are consumed and
    /// discarded. Pass 0 for unpadded strings.
    pub fn read_short_string(&mut self, max_length: usize) -> Result<String> {
        let length = self.read_u8()? as usize;
        let bytes = self.read_bytes(length)?;
        let (text, _, _) = self.encoding.decode(&bytes);
        if max_length > length {
            self.skip((max_length - length) as u64)?;
        }
        Ok(text.into_owned())
    }

    /// Read `byte_length` bytes as an indexable bit array.
    pub fn read_bit_array(&mut self, byte_length: usize) -> Result<BitArray> {
        Ok(BitArray::from_bytes(self.read_bytes(byte_length)?))
    }
}

/// A sequence of booleans packed least-significant-bit first per byte.
#[derive(Debug, Clone)]
pub struct BitArray {
    bytes: Vec<u8>,
}

impl BitArray {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Number of addressable bits.
    pub fn len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read one bit; out-of-range indexes read as false.
    pub fn get(&self, index: usize) -> bool {
        self.bytes
            .get(index / 8)
            .is_some_and(|byte| byte >> (index % 8) & 1 == 1)
    }
}
