//! Editability/visibility state shared by layers and attributes.

/// State of a layer or attribute as stored in its status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Fully editable.
    Editable,
    /// Visible and selectable, but not editable.
    Markable,
    /// Visible only.
    Visible,
    /// Hidden.
    Invisible,
}

impl State {
    /// Map the on-disk state code. Codes outside 0..=3 are not defined.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(State::Editable),
            1 => Some(State::Markable),
            2 => Some(State::Visible),
            3 => Some(State::Invisible),
            _ => None,
        }
    }
}
