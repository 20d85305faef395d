//! Terminal surface contract
//!
//! The facade never looks at cells or rows. Whatever owns the screen buffer
//! implements [`TerminalSurface`] and answers in character offsets.

use std::fmt;

/// A `(location, length)` character range, shaped like `NSRange`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub location: usize,
    pub length: usize,
}

impl TextRange {
    pub const fn new(location: usize, length: usize) -> Self {
        Self { location, length }
    }

    /// Empty range at `location`
    pub const fn caret(location: usize) -> Self {
        Self::new(location, 0)
    }

    /// One past the last character
    pub const fn end(&self) -> usize {
        self.location + self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl From<TextRange> for (usize, usize) {
    fn from(range: TextRange) -> Self {
        (range.location, range.length)
    }
}

impl From<(usize, usize)> for TextRange {
    fn from((location, length): (usize, usize)) -> Self {
        Self::new(location, length)
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.location, self.length)
    }
}

/// Operations the accessibility facade needs from a terminal surface.
///
/// Implementations are authoritative: the facade does not cache or
/// re-validate anything they return. Each query should read a consistent
/// snapshot and must not block rendering for longer than a copy takes.
pub trait TerminalSurface: Send + Sync {
    /// Entire buffer including scrollback, line breaks preserved
    fn full_text(&self) -> String;

    /// 0-based character offset of the cursor within [`full_text`](Self::full_text)
    fn cursor_character_offset(&self) -> usize;

    /// Number of characters in [`full_text`](Self::full_text)
    fn character_count(&self) -> usize;

    /// Part of the text inside the viewport
    fn visible_range(&self) -> TextRange;

    /// Hand `text` to the running program as typed input
    fn deliver_input(&self, text: &str);

    /// Ask for the cursor to move to `offset`. Clamping is up to the surface.
    fn request_cursor_move(&self, offset: usize);

    /// Current selection, if the surface tracks one
    fn selected_range(&self) -> Option<TextRange> {
        None
    }

    /// Text of the current selection, empty without one.
    ///
    /// The default reads the range and the text separately; surfaces that
    /// can change between the two reads should answer from one snapshot.
    fn selected_text(&self) -> String {
        match self.selected_range() {
            Some(range) => self
                .full_text()
                .chars()
                .skip(range.location)
                .take(range.length)
                .collect(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_conversions() {
        let range = TextRange::new(6, 5);
        assert_eq!(range.end(), 11);
        assert_eq!(<(usize, usize)>::from(range), (6, 5));
        assert_eq!(TextRange::from((0, 0)), TextRange::default());
        assert!(TextRange::caret(3).is_empty());
        assert_eq!(range.to_string(), "{6, 5}");
    }
}
