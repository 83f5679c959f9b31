//! Surface diffing and the diff-to-ANSI encoder.
//!
//! [`Comparer`] computes row-major change runs between two surfaces;
//! [`AnsiEncoder`] turns a diff into the minimal xterm-compatible byte
//! stream: cursor moves only when needed, SGR deltas against a tracked
//! pen, OSC 8 hyperlink spans, and a single trailing reset when the pen
//! was touched. Equal surfaces produce zero bytes.

use std::fmt::Write as _;

use braid_term::{Attrs, Cell, Color, LinkHandle, NamedColor, Style};

use crate::caps::ColorSupport;

use super::Surface;

/// Unchanged spans shorter than this are folded into the surrounding
/// run: rewriting a few cells is cheaper than a cursor move.
pub const GAP_COALESCE: usize = 3;

/// A run of cells to rewrite on one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffRun {
    /// Row.
    pub y: u16,
    /// First column of the run.
    pub x: u16,
    /// The new cell contents, left to right.
    pub cells: Vec<Cell>,
}

/// An ordered list of change runs, top-to-bottom, left-to-right.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SurfaceDiff {
    /// The runs.
    pub runs: Vec<DiffRun>,
}

impl SurfaceDiff {
    /// Returns true if the surfaces compared equal.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Computes minimal diffs between two equally-sized surfaces.
#[derive(Clone, Debug)]
pub struct Comparer {
    gap: usize,
}

impl Default for Comparer {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparer {
    /// Create a comparer with the default gap-coalescing threshold.
    pub fn new() -> Self {
        Self { gap: GAP_COALESCE }
    }

    /// Override the gap-coalescing threshold.
    #[must_use]
    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    /// Diff two surfaces. Differing dimensions diff as a full repaint
    /// of `curr` (the resize path).
    pub fn diff(&self, prev: &Surface, curr: &Surface) -> SurfaceDiff {
        let mut runs = Vec::new();
        let full = prev.size() != curr.size();
        for y in 0..curr.height() {
            let mut spans: Vec<(u16, u16)> = Vec::new();
            for x in 0..curr.width() {
                let changed = full || prev.get(x, y) != curr.get(x, y);
                if !changed {
                    continue;
                }
                // A changed continuation implies its head changed too;
                // anchor the span on the head so the encoder can rewrite
                // the whole grapheme.
                let x = if curr.get(x, y).is_some_and(Cell::is_continuation) {
                    x.saturating_sub(1)
                } else {
                    x
                };
                match spans.last_mut() {
                    Some((_, end)) if usize::from(x.saturating_sub(*end)) <= self.gap => {
                        *end = (*end).max(x);
                    }
                    _ => spans.push((x, x)),
                }
            }
            for (start, end) in spans {
                let cells = (start..=end)
                    .filter_map(|x| curr.get(x, y).cloned())
                    .collect();
                runs.push(DiffRun { y, x: start, cells });
            }
        }
        SurfaceDiff { runs }
    }
}

/// Encodes a [`SurfaceDiff`] into ANSI bytes.
///
/// Pen and cursor state are tracked within one frame; every frame ends
/// with a reset if the pen was touched, so frames are independent and a
/// dropped frame never corrupts later ones.
#[derive(Clone, Debug)]
pub struct AnsiEncoder {
    color: ColorSupport,
}

impl AnsiEncoder {
    /// Create an encoder emitting colors at the given depth. Richer
    /// colors are downgraded to the nearest representable one.
    pub fn new(color: ColorSupport) -> Self {
        Self { color }
    }

    /// Encode a diff. An empty diff encodes to zero bytes.
    pub fn encode(&self, diff: &SurfaceDiff) -> Vec<u8> {
        if diff.is_empty() {
            return Vec::new();
        }
        let mut out = String::new();
        let mut pen = Style::default();
        let mut pen_touched = false;
        let mut link: Option<LinkHandle> = None;
        let mut cursor: Option<(u16, u16)> = None;

        for run in &diff.runs {
            if cursor != Some((run.x, run.y)) {
                let _ = write!(out, "\x1b[{};{}H", run.y + 1, run.x + 1);
            }
            let mut x = run.x;
            for cell in &run.cells {
                // The head's width already advanced the cursor over the
                // continuation column.
                if cell.is_continuation() {
                    continue;
                }
                if cell.style.link != link {
                    self.write_link(&mut out, cell.style.link.as_ref());
                    link = cell.style.link.clone();
                }
                if self.write_style_delta(&mut out, &pen, &cell.style) {
                    pen_touched = true;
                }
                pen = cell.style.clone();
                out.push_str(cell.visible());
                x += u16::from(cell.width.max(1));
            }
            cursor = Some((x, run.y));
        }

        if link.is_some() {
            out.push_str("\x1b]8;;\x1b\\");
        }
        if pen_touched {
            out.push_str("\x1b[0m");
        }
        out.into_bytes()
    }

    /// Emit the minimal SGR transition from `prev` to `next`. Returns
    /// whether anything was written.
    fn write_style_delta(&self, out: &mut String, prev: &Style, next: &Style) -> bool {
        let before = out.len();
        let prev_attrs = prev.attrs.renditions();
        let next_attrs = next.attrs.renditions();

        if !prev_attrs.difference(next_attrs).is_empty() {
            // An attribute turned off: SGR has no per-attribute "off" we
            // can rely on everywhere, so reset and rebuild.
            out.push_str("\x1b[0m");
            self.write_full(out, next);
            return out.len() > before;
        }

        for (attr, code) in ATTR_CODES {
            if !prev_attrs.contains(*attr) && next_attrs.contains(*attr) {
                let _ = write!(out, "\x1b[{code}m");
            }
        }
        let colors_on = self.color != ColorSupport::NoColor;
        if prev.fg != next.fg {
            match next.fg {
                Some(c) => self.write_color(out, c, false),
                None if colors_on => out.push_str("\x1b[39m"),
                None => {}
            }
        }
        if prev.bg != next.bg {
            match next.bg {
                Some(c) => self.write_color(out, c, true),
                None if colors_on => out.push_str("\x1b[49m"),
                None => {}
            }
        }
        out.len() > before
    }

    fn write_full(&self, out: &mut String, style: &Style) {
        let attrs = style.attrs.renditions();
        for (attr, code) in ATTR_CODES {
            if attrs.contains(*attr) {
                let _ = write!(out, "\x1b[{code}m");
            }
        }
        if let Some(fg) = style.fg {
            self.write_color(out, fg, false);
        }
        if let Some(bg) = style.bg {
            self.write_color(out, bg, true);
        }
    }

    fn write_color(&self, out: &mut String, color: Color, background: bool) {
        let color = downgrade(color, self.color);
        let base: u16 = if background { 40 } else { 30 };
        match color {
            Some(Color::Named(n)) => {
                let idx = u16::from(n.index());
                let code = if idx < 8 {
                    base + idx
                } else {
                    base + 60 + (idx - 8)
                };
                let _ = write!(out, "\x1b[{code}m");
            }
            Some(Color::Indexed(i)) => {
                let _ = write!(out, "\x1b[{};5;{}m", base + 8, i);
            }
            Some(Color::Rgb { r, g, b }) => {
                let _ = write!(out, "\x1b[{};2;{r};{g};{b}m", base + 8);
            }
            // NoColor: the color is dropped, not replaced by a default.
            None => {}
            // Color is #[non_exhaustive]; no other variants exist today.
            Some(_) => {}
        }
    }

    fn write_link(&self, out: &mut String, link: Option<&LinkHandle>) {
        match link {
            Some(handle) => {
                let _ = write!(out, "\x1b]8;;{}\x1b\\", handle.uri());
            }
            None => out.push_str("\x1b]8;;\x1b\\"),
        }
    }
}

const ATTR_CODES: &[(Attrs, u16)] = &[
    (Attrs::BOLD, 1),
    (Attrs::DIM, 2),
    (Attrs::ITALIC, 3),
    (Attrs::UNDERLINE, 4),
    (Attrs::BLINK, 5),
    (Attrs::REVERSE, 7),
    (Attrs::HIDDEN, 8),
    (Attrs::STRIKETHROUGH, 9),
];

/// Downgrade a color to the given support level. `None` means "drop the
/// color entirely" (NoColor terminals).
fn downgrade(color: Color, support: ColorSupport) -> Option<Color> {
    match support {
        ColorSupport::TrueColor => Some(color),
        ColorSupport::Extended256 => Some(match color {
            Color::Rgb { r, g, b } => Color::Indexed(rgb_to_256(r, g, b)),
            other => other,
        }),
        ColorSupport::Basic16 => Some(match color {
            Color::Rgb { r, g, b } => Color::Named(rgb_to_16(r, g, b)),
            Color::Indexed(i) => Color::Named(index_to_named(i)),
            other => other,
        }),
        ColorSupport::NoColor => None,
    }
}

/// Nearest 256-palette index for an RGB color (6x6x6 cube + gray ramp).
fn rgb_to_256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        if r < 8 {
            return 16;
        }
        if r > 248 {
            return 231;
        }
        return 232 + ((u16::from(r) - 8) / 10) as u8;
    }
    let scale = |v: u8| -> u16 { (u16::from(v) * 5 + 127) / 255 };
    (16 + 36 * scale(r) + 6 * scale(g) + scale(b)) as u8
}

/// Nearest of the 16 ANSI colors by channel distance.
fn rgb_to_16(r: u8, g: u8, b: u8) -> NamedColor {
    const PALETTE: &[(NamedColor, (u8, u8, u8))] = &[
        (NamedColor::Black, (0, 0, 0)),
        (NamedColor::Red, (128, 0, 0)),
        (NamedColor::Green, (0, 128, 0)),
        (NamedColor::Yellow, (128, 128, 0)),
        (NamedColor::Blue, (0, 0, 128)),
        (NamedColor::Magenta, (128, 0, 128)),
        (NamedColor::Cyan, (0, 128, 128)),
        (NamedColor::White, (192, 192, 192)),
        (NamedColor::BrightBlack, (128, 128, 128)),
        (NamedColor::BrightRed, (255, 0, 0)),
        (NamedColor::BrightGreen, (0, 255, 0)),
        (NamedColor::BrightYellow, (255, 255, 0)),
        (NamedColor::BrightBlue, (0, 0, 255)),
        (NamedColor::BrightMagenta, (255, 0, 255)),
        (NamedColor::BrightCyan, (0, 255, 255)),
        (NamedColor::BrightWhite, (255, 255, 255)),
    ];
    let dist = |(pr, pg, pb): (u8, u8, u8)| -> u32 {
        let dr = i32::from(r) - i32::from(pr);
        let dg = i32::from(g) - i32::from(pg);
        let db = i32::from(b) - i32::from(pb);
        (dr * dr + dg * dg + db * db) as u32
    };
    PALETTE
        .iter()
        .min_by_key(|(_, rgb)| dist(*rgb))
        .map(|(named, _)| *named)
        .unwrap_or(NamedColor::White)
}

/// Map a 256-palette index onto the basic 16.
fn index_to_named(i: u8) -> NamedColor {
    if i < 16 {
        return NamedColor::from_index(i).unwrap_or(NamedColor::White);
    }
    let (r, g, b) = index_to_rgb(i);
    rgb_to_16(r, g, b)
}

fn index_to_rgb(i: u8) -> (u8, u8, u8) {
    if i >= 232 {
        let v = 8 + (i - 232) * 10;
        return (v, v, v);
    }
    if i >= 16 {
        let i = i - 16;
        let level = |n: u8| -> u8 {
            if n == 0 { 0 } else { 55 + n * 40 }
        };
        return (level(i / 36), level((i / 6) % 6), level(i % 6));
    }
    (0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_term::Style;

    fn encode(prev: &Surface, curr: &Surface) -> Vec<u8> {
        let diff = Comparer::new().diff(prev, curr);
        AnsiEncoder::new(ColorSupport::TrueColor).encode(&diff)
    }

    #[test]
    fn identical_surfaces_emit_nothing() {
        let blank = Surface::new(10, 3);
        assert!(encode(&blank, &blank.clone()).is_empty());
    }

    #[test]
    fn hi_at_origin_emits_one_move() {
        let prev = Surface::new(10, 3);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "Hi", &Style::default());
        let bytes = encode(&prev, &curr);
        assert_eq!(bytes, b"\x1b[1;1HHi");
    }

    #[test]
    fn wide_grapheme_emits_head_once() {
        let prev = Surface::new(4, 1);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "\u{4f60}", &Style::default());
        let bytes = encode(&prev, &curr);
        let mut expected = b"\x1b[1;1H".to_vec();
        expected.extend_from_slice("\u{4f60}".as_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn small_gaps_coalesce_into_one_run() {
        let prev = Surface::new(12, 1);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "ab", &Style::default());
        // Two unchanged columns, then more changes: below the threshold,
        // so one run covers the whole span.
        curr.write_text(4, 0, "cd", &Style::default());
        let diff = Comparer::new().diff(&prev, &curr);
        assert_eq!(diff.runs.len(), 1);
        assert_eq!(diff.runs[0].x, 0);
        assert_eq!(diff.runs[0].cells.len(), 6);

        let bytes = AnsiEncoder::new(ColorSupport::TrueColor).encode(&diff);
        assert_eq!(bytes, b"\x1b[1;1Hab  cd");
    }

    #[test]
    fn large_gaps_split_runs() {
        let prev = Surface::new(20, 1);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "ab", &Style::default());
        curr.write_text(10, 0, "cd", &Style::default());
        let diff = Comparer::new().diff(&prev, &curr);
        assert_eq!(diff.runs.len(), 2);
        let bytes = AnsiEncoder::new(ColorSupport::TrueColor).encode(&diff);
        assert_eq!(bytes, b"\x1b[1;1Hab\x1b[1;11Hcd");
    }

    #[test]
    fn consecutive_rows_each_get_a_move() {
        let prev = Surface::new(5, 2);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "a", &Style::default());
        curr.write_text(0, 1, "b", &Style::default());
        let bytes = encode(&prev, &curr);
        assert_eq!(bytes, b"\x1b[1;1Ha\x1b[2;1Hb");
    }

    #[test]
    fn styled_cells_reset_at_end() {
        let prev = Surface::new(5, 1);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "x", &Style::new().attrs(Attrs::BOLD));
        let bytes = encode(&prev, &curr);
        assert_eq!(bytes, b"\x1b[1;1H\x1b[1mx\x1b[0m");
    }

    #[test]
    fn attr_turning_off_forces_reset_then_rebuild() {
        let prev = Surface::new(4, 1);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "a", &Style::new().attrs(Attrs::BOLD));
        curr.write_text(1, 0, "b", &Style::new().fg(Color::Named(NamedColor::Red)));
        let bytes = encode(&prev, &curr);
        assert_eq!(bytes, b"\x1b[1;1H\x1b[1ma\x1b[0m\x1b[31mb\x1b[0m");
    }

    #[test]
    fn truecolor_downgrades_to_256() {
        let prev = Surface::new(2, 1);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "x", &Style::new().fg(Color::Rgb { r: 255, g: 0, b: 0 }));
        let diff = Comparer::new().diff(&prev, &curr);
        let bytes = AnsiEncoder::new(ColorSupport::Extended256).encode(&diff);
        let s = String::from_utf8_lossy(&bytes);
        assert!(s.contains("\x1b[38;5;196m"), "got {s:?}");
    }

    #[test]
    fn no_color_strips_colors() {
        let prev = Surface::new(2, 1);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "x", &Style::new().fg(Color::Rgb { r: 255, g: 0, b: 0 }));
        let diff = Comparer::new().diff(&prev, &curr);
        let bytes = AnsiEncoder::new(ColorSupport::NoColor).encode(&diff);
        assert_eq!(bytes, b"\x1b[1;1Hx");
    }

    #[test]
    fn dimension_mismatch_repaints_everything() {
        let prev = Surface::new(2, 1);
        let mut curr = Surface::new(3, 1);
        curr.write_text(0, 0, "abc", &Style::default());
        let diff = Comparer::new().diff(&prev, &curr);
        assert_eq!(diff.runs.len(), 1);
        assert_eq!(diff.runs[0].cells.len(), 3);
    }

    #[test]
    fn rgb_gray_ramp() {
        assert_eq!(rgb_to_256(0, 0, 0), 16);
        assert_eq!(rgb_to_256(255, 255, 255), 231);
        assert_eq!(rgb_to_256(128, 128, 128), 244);
    }

    #[test]
    fn rgb_to_16_picks_nearest() {
        assert_eq!(rgb_to_16(250, 5, 5), NamedColor::BrightRed);
        assert_eq!(rgb_to_16(0, 0, 0), NamedColor::Black);
    }

    #[test]
    fn hyperlink_cells_emit_osc8_span() {
        let mut table = braid_term::TrackedTable::new();
        let link = table.register_link(None, "https://example.com".into());
        let prev = Surface::new(8, 1);
        let mut curr = prev.clone();
        curr.write_text(0, 0, "doc", &Style::new().link(link));
        curr.write_text(3, 0, "!", &Style::default());
        let bytes = encode(&prev, &curr);
        let s = String::from_utf8_lossy(&bytes);
        // Opened before the linked run, closed before the plain cell.
        assert_eq!(
            s,
            "\x1b[1;1H\x1b]8;;https://example.com\x1b\\doc\x1b]8;;\x1b\\!"
        );
    }

    #[test]
    fn zero_bytes_iff_equal() {
        let mut a = Surface::new(6, 2);
        a.write_text(0, 0, "same", &Style::default());
        let b = a.clone();
        assert!(encode(&a, &b).is_empty());
        let mut c = b.clone();
        c.write_text(0, 1, "!", &Style::default());
        assert!(!encode(&a, &c).is_empty());
    }
}
