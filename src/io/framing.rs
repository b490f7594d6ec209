//! File signature parsing and decompression framing.
//!
//! The first 32 bytes of a DMF file are a text signature, for example:
//!
//! ```text
//! GeoSystem DMF, Version 1.10 C  \x1A
//! ```
//!
//! Bytes 0–22 are a free-form product banner; bytes 23–26 carry the
//! version text; byte 28 is the compression marker. When the marker is
//! `'C'`, everything after the signature is a zlib stream (RFC 1950)
//! whose body is raw deflate.

use std::io::Read;

use ahash::AHashSet;
use flate2::read::DeflateDecoder;
use once_cell::sync::Lazy;

use crate::error::{DmfError, Result};
use crate::types::Version;

/// Size of the file signature block.
pub const SIGNATURE_SIZE: usize = 32;

const VERSION_TEXT_RANGE: std::ops::Range<usize> = 23..27;
const COMPRESSION_MARKER_OFFSET: usize = 28;
const COMPRESSION_MARKER: u8 = b'C';

/// Versions this decoder understands.
static SUPPORTED_VERSIONS: Lazy<AHashSet<Version>> =
    Lazy::new(|| [Version::new(1, 10), Version::new(1, 15)].into_iter().collect());

/// Parsed file signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub version: Version,
    pub is_compressed: bool,
}

impl Signature {
    /// Whether this signature's version is in the supported set.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_VERSIONS.contains(&self.version)
    }
}

/// Read and parse the 32-byte signature from the head of the stream.
pub fn read_signature<R: Read>(stream: &mut R) -> Result<Signature> {
    let mut buffer = [0u8; SIGNATURE_SIZE];
    stream
        .read_exact(&mut buffer)
        .map_err(|e| DmfError::from_read(e, "32-byte file signature"))?;
    parse_signature(&buffer)
}

fn parse_signature(buffer: &[u8; SIGNATURE_SIZE]) -> Result<Signature> {
    let text = std::str::from_utf8(&buffer[VERSION_TEXT_RANGE])
        .map_err(|_| DmfError::InvalidFormat("signature version text is not ASCII".to_string()))?
        .trim();

    let (major, minor) = text.split_once('.').ok_or_else(|| {
        DmfError::InvalidFormat(format!("signature version text '{text}' has no dot"))
    })?;
    let major: u32 = major.parse().map_err(|_| {
        DmfError::InvalidFormat(format!("signature version text '{text}' is not numeric"))
    })?;
    let minor: u32 = minor.parse().map_err(|_| {
        DmfError::InvalidFormat(format!("signature version text '{text}' is not numeric"))
    })?;

    Ok(Signature {
        version: Version::new(major, minor),
        is_compressed: buffer[COMPRESSION_MARKER_OFFSET] == COMPRESSION_MARKER,
    })
}

/// Select the byte source for everything after the signature.
///
/// For a compressed file the two-byte zlib header is validated here,
/// before any structural parsing: a set FDICT flag means a preset
/// dictionary, which no known producer writes and this decoder rejects.
/// The body is then pulled through a raw deflate decoder; the trailing
/// Adler-32 checksum is not verified.
pub fn framed_stream<'a, R: Read + 'a>(
    mut stream: R,
    is_compressed: bool,
) -> Result<Box<dyn Read + 'a>> {
    if !is_compressed {
        return Ok(Box::new(stream));
    }

    let mut header = [0u8; 2];
    stream
        .read_exact(&mut header)
        .map_err(|e| DmfError::from_read(e, "zlib stream header"))?;
    if header[1] >> 5 & 1 == 1 {
        return Err(DmfError::UnsupportedFormat(
            "zlib stream declares a preset dictionary".to_string(),
        ));
    }

    Ok(Box::new(DeflateDecoder::new(stream)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature_bytes(version: &str, marker: u8) -> [u8; SIGNATURE_SIZE] {
        let mut buffer = [b' '; SIGNATURE_SIZE];
        buffer[..23].copy_from_slice(b"GeoSystem DMF, Version ");
        buffer[23..23 + version.len()].copy_from_slice(version.as_bytes());
        buffer[COMPRESSION_MARKER_OFFSET] = marker;
        buffer[31] = 0x1A;
        buffer
    }

    #[test]
    fn test_parse_uncompressed_signature() {
        let signature = parse_signature(&signature_bytes("1.10", b' ')).unwrap();
        assert_eq!(signature.version, Version::new(1, 10));
        assert!(!signature.is_compressed);
        assert!(signature.is_supported());
    }

    #[test]
    fn test_parse_compressed_signature() {
        let signature = parse_signature(&signature_bytes("1.15", COMPRESSION_MARKER)).unwrap();
        assert!(signature.is_compressed);
        assert!(signature.is_supported());
    }

    #[test]
    fn test_unknown_version_is_parsed_but_unsupported() {
        let signature = parse_signature(&signature_bytes("2.0", b' ')).unwrap();
        assert_eq!(signature.version, Version::new(2, 0));
        assert!(!signature.is_supported());
    }

    #[test]
    fn test_version_text_without_dot_fails() {
        let err = parse_signature(&signature_bytes("abcd", b' ')).unwrap_err();
        assert!(matches!(err, DmfError::InvalidFormat(_)));
    }

    #[test]
    fn test_short_signature_is_truncation() {
        let mut short: &[u8] = &[0u8; 16];
        assert!(matches!(
            read_signature(&mut short),
            Err(DmfError::TruncatedInput(_))
        ));
    }

    #[test]
    fn test_preset_dictionary_is_rejected() {
        // CMF 0x78, FLG with FDICT (bit 5) set
        let data: &[u8] = &[0x78, 0x20, 0x00];
        assert!(matches!(
            framed_stream(data, true),
            Err(DmfError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_raw_framing_passes_bytes_through() {
        let data: &[u8] = &[1, 2, 3];
        let mut framed = framed_stream(data, false).unwrap();
        let mut out = Vec::new();
        framed.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }
}
