//! Drawing attributes attached to layers, attributes and symbol primitives.
//!
//! Pen and brush style codes are carried through as-is: the format writes
//! them as raw bytes and defines no validation for them, so unknown codes
//! are preserved rather than rejected.

use bitflags::bitflags;

use super::Color;

/// Line style code for a [`Pen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PenStyle(pub u8);

impl PenStyle {
    pub const SOLID: Self = Self(0);
    pub const DASH: Self = Self(1);
    pub const DOT: Self = Self(2);
    pub const DASH_DOT: Self = Self(3);
    pub const DASH_DOT_DOT: Self = Self(4);
    pub const NULL: Self = Self(5);
    pub const INSIDE_FRAME: Self = Self(6);
}

/// Fill style code for a [`Brush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BrushStyle(pub u8);

impl BrushStyle {
    pub const SOLID: Self = Self(0);
    pub const NULL: Self = Self(1);
    pub const HORIZONTAL: Self = Self(2);
    pub const VERTICAL: Self = Self(3);
    pub const FDIAGONAL: Self = Self(4);
    pub const BDIAGONAL: Self = Self(5);
    pub const CROSS: Self = Self(6);
    pub const DIAG_CROSS: Self = Self(7);
}

/// Outline drawing attributes.
///
/// `width` is in 1/10 units: the format stores a base width and a separate
/// fractional addition, merged as `base * 10 + addition` during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pen {
    pub color: Color,
    pub width: i32,
    pub style: PenStyle,
}

impl Pen {
    pub fn new(color: Color, width: i32, style: PenStyle) -> Self {
        Self {
            color,
            width,
            style,
        }
    }
}

/// Fill drawing attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    pub color: Color,
    pub style: BrushStyle,
}

impl Brush {
    pub fn new(color: Color, style: BrushStyle) -> Self {
        Self { color, style }
    }
}

bitflags! {
    /// Typeface style bits as stored in the font-style byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FontStyle: u8 {
        const BOLD = 0x1;
        const ITALIC = 0x2;
        const UNDERLINE = 0x4;
        const STRIKEOUT = 0x8;
    }
}

/// Text drawing attributes for attribute labels.
///
/// `size` is in 1/10 units, merged like pen width. `charset` is the
/// legacy Windows character-set code extracted from a `"Name:NNN"` suffix
/// on the font-name field; see [`charsets`] for the known codes.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub style: FontStyle,
    pub color: Color,
    pub size: i32,
    pub charset: u8,
    pub name: String,
}

/// Known legacy character-set codes for [`Font::charset`].
pub mod charsets {
    pub const ANSI: u8 = 0;
    pub const DEFAULT: u8 = 1;
    pub const SYMBOL: u8 = 2;
    pub const MAC: u8 = 77;
    pub const SHIFTJIS: u8 = 128;
    pub const HANGUL: u8 = 129;
    pub const JOHAB: u8 = 130;
    pub const GB2312: u8 = 134;
    pub const CHINESEBIG5: u8 = 136;
    pub const GREEK: u8 = 161;
    pub const TURKISH: u8 = 162;
    pub const VIETNAMESE: u8 = 163;
    pub const HEBREW: u8 = 177;
    pub const ARABIC: u8 = 178;
    pub const BALTIC: u8 = 186;
    pub const RUSSIAN: u8 = 204;
    pub const THAI: u8 = 222;
    pub const EASTEUROPE: u8 = 238;
    pub const OEM: u8 = 255;
}
