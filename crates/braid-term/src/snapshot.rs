//! Immutable snapshots of terminal state.
//!
//! A snapshot clones the visible screen plus a tail of scrollback. The
//! clones carry the same tracked-object handles as the live cells, so
//! hyperlinks and Sixel images stay alive until the snapshot drops.

use std::fmt::Write as _;

use crate::color::Color;
use crate::grid::Row;
use crate::style::{Attrs, Style};
use crate::term::CursorPos;

/// A frozen copy of the screen and a slice of scrollback.
#[derive(Clone, Debug)]
pub struct TermSnapshot {
    /// Terminal width at capture time.
    pub width: u16,
    /// Terminal height at capture time.
    pub height: u16,
    /// Captured scrollback rows, oldest first.
    pub scrollback: Vec<Row>,
    /// Visible screen rows, top first.
    pub screen: Vec<Row>,
    /// Cursor position at capture time.
    pub cursor: CursorPos,
    /// Whether the cursor was visible.
    pub cursor_visible: bool,
    /// Window title at capture time.
    pub title: String,
    /// Whether the alternate screen was active.
    pub alt_screen: bool,
}

impl TermSnapshot {
    /// Plain text of the visible screen, one line per row, right-trimmed.
    pub fn text(&self) -> String {
        rows_text(&self.screen)
    }

    /// Plain text of captured scrollback followed by the screen.
    pub fn full_text(&self) -> String {
        if self.scrollback.is_empty() {
            return self.text();
        }
        format!("{}\n{}", rows_text(&self.scrollback), rows_text(&self.screen))
    }

    /// A byte stream that clears a terminal and repaints this screen.
    ///
    /// Used to seed a recording started mid-session: feeding the result
    /// to a blank terminal of the same size reproduces the visible grid.
    pub fn to_ansi(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str("\x1b[0m\x1b[2J\x1b[H");
        let mut pen = Style::default();
        for (y, row) in self.screen.iter().enumerate() {
            let used = row.trimmed_len();
            if used == 0 {
                continue;
            }
            let _ = write!(out, "\x1b[{};1H", y + 1);
            for cell in &row.cells[..used] {
                if cell.is_continuation() {
                    continue;
                }
                if cell.style.fg != pen.fg
                    || cell.style.bg != pen.bg
                    || cell.style.attrs.renditions() != pen.attrs.renditions()
                {
                    push_sgr(&mut out, &cell.style);
                    pen = cell.style.clone();
                }
                out.push_str(cell.visible());
            }
        }
        if !pen.is_empty() {
            out.push_str("\x1b[0m");
        }
        let _ = write!(
            out,
            "\x1b[{};{}H",
            self.cursor.y + 1,
            self.cursor.x.min(self.width.saturating_sub(1)) + 1
        );
        if !self.cursor_visible {
            out.push_str("\x1b[?25l");
        }
        out.into_bytes()
    }
}

fn rows_text(rows: &[Row]) -> String {
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&row.text());
    }
    out
}

// Full (non-incremental) SGR for a style: reset, then every attribute.
fn push_sgr(out: &mut String, style: &Style) {
    let mut codes: Vec<String> = vec!["0".into()];
    let attrs = style.attrs;
    if attrs.contains(Attrs::BOLD) {
        codes.push("1".into());
    }
    if attrs.contains(Attrs::DIM) {
        codes.push("2".into());
    }
    if attrs.contains(Attrs::ITALIC) {
        codes.push("3".into());
    }
    if attrs.contains(Attrs::UNDERLINE) {
        codes.push("4".into());
    }
    if attrs.contains(Attrs::BLINK) {
        codes.push("5".into());
    }
    if attrs.contains(Attrs::REVERSE) {
        codes.push("7".into());
    }
    if attrs.contains(Attrs::HIDDEN) {
        codes.push("8".into());
    }
    if attrs.contains(Attrs::STRIKETHROUGH) {
        codes.push("9".into());
    }
    if let Some(fg) = style.fg {
        push_color_codes(&mut codes, fg, 30);
    }
    if let Some(bg) = style.bg {
        push_color_codes(&mut codes, bg, 40);
    }
    let _ = write!(out, "\x1b[{}m", codes.join(";"));
}

fn push_color_codes(codes: &mut Vec<String>, color: Color, base: u16) {
    match color {
        Color::Named(n) => {
            let idx = u16::from(n.index());
            let code = if idx < 8 {
                base + idx
            } else {
                base + 60 + (idx - 8)
            };
            codes.push(code.to_string());
        }
        Color::Indexed(i) => {
            codes.push((base + 8).to_string());
            codes.push("5".into());
            codes.push(i.to_string());
        }
        Color::Rgb { r, g, b } => {
            codes.push((base + 8).to_string());
            codes.push("2".into());
            codes.push(r.to_string());
            codes.push(g.to_string());
            codes.push(b.to_string());
        }
    }
}
