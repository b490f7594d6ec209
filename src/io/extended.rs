//! Conversion of the format's 10-byte extended-precision reals.
//!
//! All coordinate and scale values in a DMF file are stored as 80-bit x87
//! extended-precision floats: 1 sign bit, a 15-bit biased exponent and a
//! 64-bit significand with an explicit integer bit. The decoder narrows
//! them to IEEE-754 doubles, which loses the 11 lowest significand bits
//! and rejects magnitudes outside the double range.

use crate::error::{DmfError, Result};

/// Size of an extended-precision real on disk.
pub const EXTENDED_SIZE: usize = 10;

const EXTENDED_EXPONENT_BIAS: i32 = 16383;
const DOUBLE_EXPONENT_BIAS: i32 = 1023;

/// Decode a little-endian 80-bit extended-precision real into an f64.
///
/// Biased exponent zero means signed zero or a denormal; the explicit
/// integer bit must then be clear, else [`DmfError::UnsupportedValue`]
/// (pseudo-denormals are a legacy encoding this decoder does not
/// handle). A normalized exponent that rebias outside the double range
/// fails with [`DmfError::Overflow`]; the extended format's infinities
/// and NaNs land on the same check.
pub fn decode_extended(bytes: &[u8; EXTENDED_SIZE]) -> Result<f64> {
    let sign = (bytes[9] >> 7) as u64;
    let biased_extended_exponent = u16::from_le_bytes([bytes[8], bytes[9] & 0x7F]) as i32;
    let integer_bit = bytes[7] >> 7;

    let mut significand = (bytes[7] & 0x7F) as u64;
    for byte in bytes[..7].iter().rev() {
        significand = (significand << 8) | *byte as u64;
    }

    let biased_double_exponent = if biased_extended_exponent == 0 {
        if integer_bit == 1 {
            return Err(DmfError::UnsupportedValue(
                "pseudo-denormal with explicit integer bit set".to_string(),
            ));
        }
        0
    } else {
        let rebiased = biased_extended_exponent - EXTENDED_EXPONENT_BIAS + DOUBLE_EXPONENT_BIAS;
        if !(1..=2046).contains(&rebiased) {
            return Err(DmfError::Overflow);
        }
        rebiased as u64
    };

    let bits = sign << 63 | biased_double_exponent << 52 | significand >> 11;
    Ok(f64::from_bits(bits))
}
