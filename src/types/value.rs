//! Attribute value typing.
//!
//! Every attribute descriptor declares the type its values parse as; the
//! per-feature attribute string then carries the values as raw text. The
//! mapping from type tag to parse function is a closed dispatch table: the
//! format defines codes 1..=6 and this decoder rejects everything else.

use crate::error::{DmfError, Result};

/// Declared value type of an attribute, from its on-disk type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Byte,
    Int16,
    Int32,
    Float64,
    String,
    Bool,
}

impl ValueType {
    /// Map the on-disk value-type code. Codes 7..=9 are reserved by the
    /// format for list/table values this decoder does not support.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ValueType::Byte),
            2 => Some(ValueType::Int16),
            3 => Some(ValueType::Int32),
            4 => Some(ValueType::Float64),
            5 => Some(ValueType::String),
            6 => Some(ValueType::Bool),
            _ => None,
        }
    }

    /// Parse a raw attribute value string into its typed representation.
    pub fn parse(self, raw: &str) -> Result<AttributeValue> {
        let invalid = || {
            DmfError::InvalidContent(format!(
                "attribute value '{raw}' does not parse as {self:?}"
            ))
        };

        Ok(match self {
            ValueType::Byte => AttributeValue::Byte(raw.parse().map_err(|_| invalid())?),
            ValueType::Int16 => AttributeValue::Int16(raw.parse().map_err(|_| invalid())?),
            ValueType::Int32 => AttributeValue::Int32(raw.parse().map_err(|_| invalid())?),
            ValueType::Float64 => AttributeValue::Float64(raw.parse().map_err(|_| invalid())?),
            ValueType::String => AttributeValue::String(raw.to_string()),
            ValueType::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    AttributeValue::Bool(true)
                } else if raw.eq_ignore_ascii_case("false") {
                    AttributeValue::Bool(false)
                } else {
                    return Err(invalid());
                }
            }
        })
    }
}

/// A typed attribute value attached to a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Float64(f64),
    String(String),
    Bool(bool),
}
