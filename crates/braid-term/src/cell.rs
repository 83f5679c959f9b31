//! Cell type — a single grid position.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::style::Style;
use crate::tracked::SixelHandle;

/// A single cell in a terminal grid or surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// The grapheme cluster displayed in this cell. Empty for blank cells
    /// and for continuation cells.
    pub grapheme: String,
    /// Display width: 1 for most cells, 2 for wide graphemes, 0 for the
    /// continuation cell occupying the right half of a wide grapheme.
    pub width: u8,
    /// The cell's style.
    pub style: Style,
    /// Sixel image anchored at this cell, if any.
    pub sixel: Option<SixelHandle>,
}

impl Cell {
    /// Create a blank cell: empty grapheme, width 1, default style.
    pub fn empty() -> Self {
        Self {
            grapheme: String::new(),
            width: 1,
            style: Style::default(),
            sixel: None,
        }
    }

    /// Create a cell from a grapheme cluster, auto-detecting width.
    pub fn new(grapheme: impl Into<String>, style: Style) -> Self {
        let grapheme = grapheme.into();
        let width = display_width(&grapheme);
        Self {
            grapheme,
            width,
            style,
            sixel: None,
        }
    }

    /// The continuation cell stamped after a wide grapheme.
    pub fn continuation() -> Self {
        Self {
            grapheme: String::new(),
            width: 0,
            style: Style::default(),
            sixel: None,
        }
    }

    /// Returns true for the right half of a wide grapheme.
    pub fn is_continuation(&self) -> bool {
        self.width == 0 && self.grapheme.is_empty()
    }

    /// Returns true if this cell occupies two columns.
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Returns true for a blank cell: nothing visible, default style.
    pub fn is_blank(&self) -> bool {
        (self.grapheme.is_empty() || self.grapheme == " ")
            && self.width == 1
            && self.style.is_empty()
            && self.sixel.is_none()
    }

    /// The character to emit for this cell: its grapheme, or a space for
    /// blank cells. Continuation cells emit nothing.
    pub fn visible(&self) -> &str {
        if self.width == 0 {
            ""
        } else if self.grapheme.is_empty() {
            " "
        } else {
            &self.grapheme
        }
    }
}

/// Display width of a grapheme cluster: 0, 1, or 2 columns.
///
/// East Asian Width with ambiguous treated as narrow; an emoji
/// presentation selector (U+FE0F) promotes the cluster to width 2.
pub fn display_width(grapheme: &str) -> u8 {
    if grapheme.is_empty() {
        return 0;
    }
    let base = UnicodeWidthStr::width(grapheme).min(2) as u8;
    if base < 2 && grapheme.chars().any(|c| c == '\u{FE0F}') {
        return 2;
    }
    base
}

/// Split a string into grapheme clusters.
pub fn graphemes(s: &str) -> impl Iterator<Item = &str> {
    s.graphemes(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, NamedColor};
    use crate::style::Attrs;

    #[test]
    fn empty_cell() {
        let c = Cell::empty();
        assert!(c.is_blank());
        assert_eq!(c.width, 1);
        assert_eq!(c.visible(), " ");
    }

    #[test]
    fn ascii_cell() {
        let c = Cell::new("A", Style::default());
        assert_eq!(c.width, 1);
        assert!(!c.is_wide());
        assert_eq!(c.visible(), "A");
    }

    #[test]
    fn cjk_cell_width_two() {
        let c = Cell::new("\u{4f60}", Style::default()); // 你
        assert_eq!(c.width, 2);
        assert!(c.is_wide());
    }

    #[test]
    fn continuation_cell() {
        let c = Cell::continuation();
        assert!(c.is_continuation());
        assert_eq!(c.visible(), "");
    }

    #[test]
    fn styled_space_not_blank() {
        let c = Cell::new(" ", Style::new().bg(Color::Named(NamedColor::Blue)));
        assert!(!c.is_blank());
    }

    #[test]
    fn soft_wrap_marker_cell_still_blank() {
        let mut c = Cell::empty();
        c.style.attrs |= Attrs::SOFT_WRAP;
        assert!(c.is_blank());
    }

    #[test]
    fn zwj_emoji_width_two() {
        assert_eq!(display_width("\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}"), 2);
    }

    #[test]
    fn presentation_selector_promotes() {
        // U+2764 HEAVY BLACK HEART is narrow; with VS16 it renders emoji.
        assert_eq!(display_width("\u{2764}\u{FE0F}"), 2);
    }

    #[test]
    fn combining_mark_width_zero() {
        assert_eq!(display_width("\u{0301}"), 0);
    }

    #[test]
    fn grapheme_split() {
        let parts: Vec<&str> = graphemes("ae\u{0301}b").collect();
        assert_eq!(parts, vec!["a", "e\u{0301}", "b"]);
    }
}
