//! Error types for DMF decoding.

use crate::types::Version;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DmfError>;

/// Errors produced while decoding a DMF stream.
///
/// All variants are fatal to the decode in progress: the reader fails fast
/// and never recovers from a lower-level error. Messages carry enough
/// context (which list, which record) to log and discard the file.
#[derive(Debug, Error)]
pub enum DmfError {
    /// Underlying I/O failure on the byte source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes were available than a fixed-size read requires.
    #[error("truncated input: {0}")]
    TruncatedInput(String),

    /// The signature version is not in the supported set.
    #[error("version {0} is not supported")]
    UnsupportedVersion(Version),

    /// A structural header-size field does not match the one fixed layout
    /// this decoder understands.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A declared record size is smaller than the bytes its content
    /// actually occupies, or a required delimiter is missing.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// An enumerated code byte falls outside the known set.
    #[error("unsupported content: {0}")]
    UnsupportedContent(String),

    /// A value failed domain parsing or an internal consistency check.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// Reconstructed geometry violates a shape invariant.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// An extended-precision exponent does not fit the double range.
    #[error("extended value overflows the double range")]
    Overflow,

    /// An extended-precision bit pattern this decoder does not handle.
    #[error("unsupported extended value: {0}")]
    UnsupportedValue(String),
}

impl DmfError {
    /// Wrap a `read_exact` failure, turning EOF into [`DmfError::TruncatedInput`].
    pub(crate) fn from_read(err: std::io::Error, context: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            DmfError::TruncatedInput(context.to_string())
        } else {
            DmfError::Io(err)
        }
    }
}
