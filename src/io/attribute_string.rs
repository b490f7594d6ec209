//! Tokenizer for the per-feature attribute string.
//!
//! Attribute values travel inside each feature record as one string in a
//! control-character-delimited mini-language. A record looks like:
//!
//! ```text
//! 0x01 <attribute number, ASCII digits, may be negative> 0x03 <value> 0x02
//! ```
//!
//! An optional label sub-section starts at 0x05 between the value and the
//! record end; its contents are not modeled and are skipped up to the
//! closing 0x02. Text outside records carries no attribute data and is
//! ignored.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_until};
use nom::sequence::terminated;
use nom::IResult;

use crate::error::{DmfError, Result};

const RECORD_START: char = '\u{1}';
const RECORD_END: &str = "\u{2}";
const VALUE_START: &str = "\u{3}";
const LABEL_START: &str = "\u{5}";

/// One record after the 0x01 marker: number text, value text.
fn record_body(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, number_text) = terminated(take_until(VALUE_START), tag(VALUE_START))(input)?;
    let (input, value) = take_till(|c| c == '\u{2}' || c == '\u{5}')(input)?;
    let (input, delimiter) = alt((tag(RECORD_END), tag(LABEL_START)))(input)?;

    let input = if delimiter == LABEL_START {
        // label sub-section: skip to the record end
        let (input, _) = terminated(take_until(RECORD_END), tag(RECORD_END))(input)?;
        input
    } else {
        input
    };

    Ok((input, (number_text, value)))
}

/// Tokenize an attribute string into (signed attribute number, raw value)
/// pairs, in file order.
pub fn parse_attribute_string(input: &str) -> Result<Vec<(i32, String)>> {
    let mut pairs = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find(RECORD_START) {
        let body = &rest[start + 1..];
        let (remaining, (number_text, value)) = record_body(body).map_err(|_| {
            DmfError::InvalidFormat("attribute string record is missing a delimiter".to_string())
        })?;
        let number: i32 = number_text.parse().map_err(|_| {
            DmfError::InvalidFormat(format!(
                "attribute number '{number_text}' is not an integer"
            ))
        })?;
        pairs.push((number, value.to_string()));
        rest = remaining;
    }

    Ok(pairs)
}
