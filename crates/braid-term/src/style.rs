//! Text style: attribute bitset plus colors and hyperlink handle.

use crate::color::Color;
use crate::tracked::LinkHandle;

bitflags::bitflags! {
    /// SGR text attributes, plus the soft-wrap marker.
    ///
    /// `SOFT_WRAP` is not a rendition: it travels on the last cell of a
    /// row to record that the logical line continues on the next row.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Attrs: u16 {
        /// Bold / increased intensity.
        const BOLD = 1 << 0;
        /// Dim / faint.
        const DIM = 1 << 1;
        /// Italic.
        const ITALIC = 1 << 2;
        /// Underline.
        const UNDERLINE = 1 << 3;
        /// Blink.
        const BLINK = 1 << 4;
        /// Reverse video.
        const REVERSE = 1 << 5;
        /// Hidden / concealed.
        const HIDDEN = 1 << 6;
        /// Strikethrough.
        const STRIKETHROUGH = 1 << 7;
        /// Row continued onto the next row at the right margin.
        const SOFT_WRAP = 1 << 8;
    }
}

impl Attrs {
    /// The renditions only, with the soft-wrap marker masked off.
    pub fn renditions(self) -> Self {
        self & !Attrs::SOFT_WRAP
    }
}

/// Style carried by a cell or by the terminal pen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Style {
    /// Foreground color, `None` for the terminal default.
    pub fg: Option<Color>,
    /// Background color, `None` for the terminal default.
    pub bg: Option<Color>,
    /// Attribute bitset.
    pub attrs: Attrs,
    /// Active OSC 8 hyperlink, if any.
    pub link: Option<LinkHandle>,
}

impl Style {
    /// Create an empty style with no attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the foreground color.
    #[must_use]
    pub fn fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    /// Set the background color.
    #[must_use]
    pub fn bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    /// Add attributes.
    #[must_use]
    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs |= attrs;
        self
    }

    /// Set the hyperlink handle.
    #[must_use]
    pub fn link(mut self, link: LinkHandle) -> Self {
        self.link = Some(link);
        self
    }

    /// Returns true if no colors, renditions, or link are set.
    ///
    /// The soft-wrap marker does not count: a default cell at the end of
    /// a wrapped row is still "empty" for rendering purposes.
    pub fn is_empty(&self) -> bool {
        self.fg.is_none()
            && self.bg.is_none()
            && self.attrs.renditions().is_empty()
            && self.link.is_none()
    }
}
