//! VT/ANSI byte-stream parser.
//!
//! The byte state machine (ground / escape / CSI / OSC / DCS / UTF-8
//! continuation, malformed sequences resolving back to ground) is `vte`,
//! the same machine `alacritty_terminal` runs on. This module owns
//! everything above it: translating callbacks into typed [`TermOp`]s,
//! SGR parameter parsing, OSC 8 hyperlinks, DCS/Sixel payload
//! collection, and DEC private mode mapping.
//!
//! The parser is pure with respect to bytes in / ops out: it holds only
//! parse state, never terminal state. Partial UTF-8 sequences are
//! buffered across `feed` calls by vte.

use std::collections::HashSet;

use tracing::debug;
use vte::{Params, Perform};

use crate::color::{Color, NamedColor};
use crate::style::Attrs;

/// A structured operation decoded from the byte stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum TermOp {
    /// Print one decoded character. Zero-width characters combine into
    /// the previously printed cell.
    Print(char),
    /// Line feed (`\n`).
    LineFeed,
    /// Carriage return (`\r`).
    CarriageReturn,
    /// Backspace.
    Backspace,
    /// Horizontal tab.
    Tab,
    /// Bell.
    Bell,
    /// Move the cursor up `n` rows.
    CursorUp(u16),
    /// Move the cursor down `n` rows.
    CursorDown(u16),
    /// Move the cursor right `n` columns.
    CursorForward(u16),
    /// Move the cursor left `n` columns.
    CursorBack(u16),
    /// Move to column 0, `n` rows down.
    CursorNextLine(u16),
    /// Move to column 0, `n` rows up.
    CursorPrevLine(u16),
    /// Move to an absolute column on the current row (0-based).
    CursorColumn(u16),
    /// Move to an absolute row, keeping the column (0-based).
    CursorRow(u16),
    /// Absolute cursor position (0-based; origin mode applies on apply).
    SetCursor {
        /// Target column.
        x: u16,
        /// Target row.
        y: u16,
    },
    /// Select Graphic Rendition.
    Sgr(Vec<SgrOp>),
    /// Erase in display.
    EraseInDisplay(EraseMode),
    /// Erase in line.
    EraseInLine(EraseMode),
    /// Insert `n` blank lines at the cursor row.
    InsertLines(u16),
    /// Delete `n` lines at the cursor row.
    DeleteLines(u16),
    /// Insert `n` blank characters at the cursor.
    InsertChars(u16),
    /// Delete `n` characters at the cursor.
    DeleteChars(u16),
    /// Erase `n` characters at the cursor (no shift).
    EraseChars(u16),
    /// Scroll the region up `n` lines.
    ScrollUp(u16),
    /// Scroll the region down `n` lines.
    ScrollDown(u16),
    /// Set the scroll region (0-based, inclusive). `None` = full screen.
    SetScrollRegion {
        /// Top row.
        top: u16,
        /// Bottom row, or `None` for the last row.
        bottom: Option<u16>,
    },
    /// Save cursor position and pen.
    SaveCursor,
    /// Restore saved cursor position and pen.
    RestoreCursor,
    /// Set or reset a terminal mode.
    SetMode(Mode, bool),
    /// OSC 8 hyperlink. An absent URI closes the active hyperlink.
    Hyperlink {
        /// The `id=` parameter, if present.
        params_id: Option<String>,
        /// Target URI; `None` ends the link span.
        uri: Option<String>,
    },
    /// OSC 0/2 window title.
    Title(String),
    /// DCS Sixel payload.
    Sixel(Vec<u8>),
    /// DSR 6: the terminal must reply with the cursor position.
    DeviceStatusReport,
    /// DA1: the terminal must reply with its device attributes.
    PrimaryDeviceAttributes,
    /// RIS full reset.
    FullReset,
    /// ESC D: move down, scrolling at the bottom margin.
    Index,
    /// ESC M: move up, scrolling at the top margin.
    ReverseIndex,
    /// ESC E: carriage return + index.
    NextLine,
}

/// One SGR parameter group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SgrOp {
    /// Reset pen to default.
    Reset,
    /// Turn attributes on.
    Set(Attrs),
    /// Turn attributes off.
    Clear(Attrs),
    /// Set the foreground color.
    Fg(Color),
    /// Set the background color.
    Bg(Color),
    /// Reset foreground to default.
    DefaultFg,
    /// Reset background to default.
    DefaultBg,
}

/// Erase extents for ED/EL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EraseMode {
    /// From the cursor to the end.
    ToEnd,
    /// From the start to the cursor.
    ToStart,
    /// Everything.
    All,
    /// ED 3: everything plus scrollback.
    AllAndScrollback,
}

/// Terminal modes toggled by DECSET/DECRST (and SM/RM).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Mode {
    /// DECAWM auto-wrap (?7).
    Wrap,
    /// DECOM origin mode (?6).
    Origin,
    /// DECTCEM cursor visibility (?25).
    CursorVisible,
    /// Alternate screen (?47 / ?1047).
    AltScreen,
    /// Alternate screen with cursor save (?1049).
    AltScreenSaveCursor,
    /// Mouse click reporting (?1000).
    MouseClick,
    /// Mouse click+drag reporting (?1002).
    MouseDrag,
    /// All-motion mouse reporting (?1003).
    MouseMotion,
    /// SGR extended mouse encoding (?1006).
    MouseSgrEncoding,
    /// Focus in/out reporting (?1004).
    FocusReporting,
    /// Bracketed paste (?2004).
    BracketedPaste,
}

/// Streaming parser: bytes in, [`TermOp`]s out.
pub struct Parser {
    machine: vte::Parser,
    performer: Performer,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser in the ground state.
    pub fn new() -> Self {
        Self {
            machine: vte::Parser::new(),
            performer: Performer::default(),
        }
    }

    /// Consume bytes, returning the operations they decode to.
    ///
    /// Incomplete trailing sequences stay buffered; the next call
    /// continues where this one left off.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<TermOp> {
        for &byte in bytes {
            self.machine.advance(&mut self.performer, byte);
        }
        std::mem::take(&mut self.performer.ops)
    }
}

#[derive(Default)]
struct Performer {
    ops: Vec<TermOp>,
    dcs: Option<DcsKind>,
    dcs_payload: Vec<u8>,
    // Unknown sequences are logged once per code, then dropped silently.
    seen_unknown: HashSet<(char, u16)>,
}

enum DcsKind {
    Sixel,
    Other,
}

impl Performer {
    fn unknown(&mut self, kind: char, code: u16) {
        if self.seen_unknown.insert((kind, code)) {
            debug!(kind = %kind, code, "ignoring unsupported sequence");
        }
    }
}

fn first_param(params: &Params, default: u16) -> u16 {
    let v = params.iter().next().and_then(|p| p.first().copied()).unwrap_or(0);
    if v == 0 { default } else { v }
}

fn param_at(groups: &[Vec<u16>], i: usize) -> u16 {
    groups.get(i).and_then(|g| g.first().copied()).unwrap_or(0)
}

fn mode_for(code: u16) -> Option<Mode> {
    Some(match code {
        6 => Mode::Origin,
        7 => Mode::Wrap,
        25 => Mode::CursorVisible,
        47 | 1047 => Mode::AltScreen,
        1049 => Mode::AltScreenSaveCursor,
        1000 => Mode::MouseClick,
        1002 => Mode::MouseDrag,
        1003 => Mode::MouseMotion,
        1004 => Mode::FocusReporting,
        1006 => Mode::MouseSgrEncoding,
        2004 => Mode::BracketedPaste,
        _ => return None,
    })
}

/// Parse the SGR parameter list into ops.
///
/// Handles both the semicolon form (`38;5;n`, `38;2;r;g;b`) and the
/// colon sub-parameter form (`38:5:n`).
fn parse_sgr(groups: &[Vec<u16>]) -> Vec<SgrOp> {
    let mut ops = Vec::new();
    if groups.is_empty() {
        return vec![SgrOp::Reset];
    }
    let mut i = 0;
    while i < groups.len() {
        let code = param_at(groups, i);
        match code {
            0 => ops.push(SgrOp::Reset),
            1 => ops.push(SgrOp::Set(Attrs::BOLD)),
            2 => ops.push(SgrOp::Set(Attrs::DIM)),
            3 => ops.push(SgrOp::Set(Attrs::ITALIC)),
            4 => ops.push(SgrOp::Set(Attrs::UNDERLINE)),
            5 | 6 => ops.push(SgrOp::Set(Attrs::BLINK)),
            7 => ops.push(SgrOp::Set(Attrs::REVERSE)),
            8 => ops.push(SgrOp::Set(Attrs::HIDDEN)),
            9 => ops.push(SgrOp::Set(Attrs::STRIKETHROUGH)),
            21 | 22 => ops.push(SgrOp::Clear(Attrs::BOLD | Attrs::DIM)),
            23 => ops.push(SgrOp::Clear(Attrs::ITALIC)),
            24 => ops.push(SgrOp::Clear(Attrs::UNDERLINE)),
            25 => ops.push(SgrOp::Clear(Attrs::BLINK)),
            27 => ops.push(SgrOp::Clear(Attrs::REVERSE)),
            28 => ops.push(SgrOp::Clear(Attrs::HIDDEN)),
            29 => ops.push(SgrOp::Clear(Attrs::STRIKETHROUGH)),
            30..=37 => {
                if let Some(named) = NamedColor::from_index((code - 30) as u8) {
                    ops.push(SgrOp::Fg(Color::Named(named)));
                }
            }
            38 => {
                if let Some(color) = parse_extended_color(groups, &mut i) {
                    ops.push(SgrOp::Fg(color));
                }
            }
            39 => ops.push(SgrOp::DefaultFg),
            40..=47 => {
                if let Some(named) = NamedColor::from_index((code - 40) as u8) {
                    ops.push(SgrOp::Bg(Color::Named(named)));
                }
            }
            48 => {
                if let Some(color) = parse_extended_color(groups, &mut i) {
                    ops.push(SgrOp::Bg(color));
                }
            }
            49 => ops.push(SgrOp::DefaultBg),
            90..=97 => {
                if let Some(named) = NamedColor::from_index((code - 90 + 8) as u8) {
                    ops.push(SgrOp::Fg(Color::Named(named)));
                }
            }
            100..=107 => {
                if let Some(named) = NamedColor::from_index((code - 100 + 8) as u8) {
                    ops.push(SgrOp::Bg(Color::Named(named)));
                }
            }
            _ => {}
        }
        i += 1;
    }
    ops
}

/// Parse a 256-color or truecolor spec starting at `groups[*i]` (which
/// holds 38 or 48). Advances `*i` past any consumed semicolon params.
fn parse_extended_color(groups: &[Vec<u16>], i: &mut usize) -> Option<Color> {
    let group = groups.get(*i)?;
    if group.len() >= 2 {
        // Colon sub-parameter form: the whole spec is one group.
        return match group[1] {
            5 => Some(Color::Indexed(*group.get(2)? as u8)),
            2 => {
                // 38:2:[colorspace]:r:g:b or 38:2:r:g:b
                let rgb = if group.len() >= 6 { &group[3..6] } else { group.get(2..5)? };
                Some(Color::Rgb {
                    r: *rgb.first()? as u8,
                    g: *rgb.get(1)? as u8,
                    b: *rgb.get(2)? as u8,
                })
            }
            _ => None,
        };
    }
    // Semicolon form: the spec spans the following parameter groups.
    match param_at(groups, *i + 1) {
        5 => {
            let idx = param_at(groups, *i + 2);
            *i += 2;
            Some(Color::Indexed(idx as u8))
        }
        2 => {
            let (r, g, b) = (
                param_at(groups, *i + 2),
                param_at(groups, *i + 3),
                param_at(groups, *i + 4),
            );
            *i += 4;
            Some(Color::Rgb {
                r: r as u8,
                g: g as u8,
                b: b as u8,
            })
        }
        _ => None,
    }
}

impl Perform for Performer {
    fn print(&mut self, c: char) {
        self.ops.push(TermOp::Print(c));
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' | 0x0b | 0x0c => self.ops.push(TermOp::LineFeed),
            b'\r' => self.ops.push(TermOp::CarriageReturn),
            0x08 => self.ops.push(TermOp::Backspace),
            b'\t' => self.ops.push(TermOp::Tab),
            0x07 => self.ops.push(TermOp::Bell),
            _ => self.unknown('C', u16::from(byte)),
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, action: char) {
        self.dcs_payload.clear();
        self.dcs = Some(if action == 'q' {
            DcsKind::Sixel
        } else {
            self.unknown('P', action as u16);
            DcsKind::Other
        });
    }

    fn put(&mut self, byte: u8) {
        if matches!(self.dcs, Some(DcsKind::Sixel)) {
            self.dcs_payload.push(byte);
        }
    }

    fn unhook(&mut self) {
        if matches!(self.dcs.take(), Some(DcsKind::Sixel)) {
            self.ops.push(TermOp::Sixel(std::mem::take(&mut self.dcs_payload)));
        }
        self.dcs_payload.clear();
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        let Some(&code) = params.first() else { return };
        match code {
            b"0" | b"2" => {
                if let Some(title) = params.get(1) {
                    self.ops
                        .push(TermOp::Title(String::from_utf8_lossy(title).into_owned()));
                }
            }
            b"8" => {
                let params_id = params.get(1).and_then(|p| {
                    let s = String::from_utf8_lossy(p);
                    s.split(':')
                        .find_map(|kv| kv.strip_prefix("id=").map(str::to_string))
                });
                let uri = params
                    .get(2)
                    .filter(|u| !u.is_empty())
                    .map(|u| String::from_utf8_lossy(u).into_owned());
                self.ops.push(TermOp::Hyperlink { params_id, uri });
            }
            _ => {
                let n: u16 = std::str::from_utf8(code)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(u16::MAX);
                self.unknown(']', n);
            }
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, action: char) {
        let private = intermediates.first() == Some(&b'?');
        let groups: Vec<Vec<u16>> = params.iter().map(|g| g.to_vec()).collect();
        match (action, private) {
            ('A', _) => self.ops.push(TermOp::CursorUp(first_param(params, 1))),
            ('B' | 'e', _) => self.ops.push(TermOp::CursorDown(first_param(params, 1))),
            ('C' | 'a', _) => self.ops.push(TermOp::CursorForward(first_param(params, 1))),
            ('D', _) => self.ops.push(TermOp::CursorBack(first_param(params, 1))),
            ('E', _) => self.ops.push(TermOp::CursorNextLine(first_param(params, 1))),
            ('F', _) => self.ops.push(TermOp::CursorPrevLine(first_param(params, 1))),
            ('G' | '`', _) => self
                .ops
                .push(TermOp::CursorColumn(first_param(params, 1) - 1)),
            ('H' | 'f', _) => {
                let y = param_at(&groups, 0).max(1) - 1;
                let x = param_at(&groups, 1).max(1) - 1;
                self.ops.push(TermOp::SetCursor { x, y });
            }
            ('d', _) => self.ops.push(TermOp::CursorRow(first_param(params, 1) - 1)),
            ('J', _) => {
                let mode = match param_at(&groups, 0) {
                    0 => EraseMode::ToEnd,
                    1 => EraseMode::ToStart,
                    2 => EraseMode::All,
                    3 => EraseMode::AllAndScrollback,
                    n => {
                        self.unknown('J', n);
                        return;
                    }
                };
                self.ops.push(TermOp::EraseInDisplay(mode));
            }
            ('K', _) => {
                let mode = match param_at(&groups, 0) {
                    0 => EraseMode::ToEnd,
                    1 => EraseMode::ToStart,
                    2 => EraseMode::All,
                    n => {
                        self.unknown('K', n);
                        return;
                    }
                };
                self.ops.push(TermOp::EraseInLine(mode));
            }
            ('L', _) => self.ops.push(TermOp::InsertLines(first_param(params, 1))),
            ('M', _) => self.ops.push(TermOp::DeleteLines(first_param(params, 1))),
            ('@', _) => self.ops.push(TermOp::InsertChars(first_param(params, 1))),
            ('P', _) => self.ops.push(TermOp::DeleteChars(first_param(params, 1))),
            ('X', _) => self.ops.push(TermOp::EraseChars(first_param(params, 1))),
            ('S', false) => self.ops.push(TermOp::ScrollUp(first_param(params, 1))),
            ('T', false) => self.ops.push(TermOp::ScrollDown(first_param(params, 1))),
            ('m', false) => self.ops.push(TermOp::Sgr(parse_sgr(&groups))),
            ('r', false) => {
                let top = param_at(&groups, 0).max(1) - 1;
                let bottom = match param_at(&groups, 1) {
                    0 => None,
                    b => Some(b - 1),
                };
                self.ops.push(TermOp::SetScrollRegion { top, bottom });
            }
            ('s', false) => self.ops.push(TermOp::SaveCursor),
            ('u', false) => self.ops.push(TermOp::RestoreCursor),
            ('h', true) | ('l', true) => {
                let enable = action == 'h';
                for group in &groups {
                    let code = group.first().copied().unwrap_or(0);
                    match mode_for(code) {
                        Some(mode) => self.ops.push(TermOp::SetMode(mode, enable)),
                        None => self.unknown('?', code),
                    }
                }
            }
            ('n', false) => match param_at(&groups, 0) {
                6 => self.ops.push(TermOp::DeviceStatusReport),
                n => self.unknown('n', n),
            },
            ('c', false) => self.ops.push(TermOp::PrimaryDeviceAttributes),
            (other, _) => self.unknown(other, param_at(&groups, 0)),
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        if !intermediates.is_empty() {
            self.unknown('E', u16::from(byte));
            return;
        }
        match byte {
            b'7' => self.ops.push(TermOp::SaveCursor),
            b'8' => self.ops.push(TermOp::RestoreCursor),
            b'c' => self.ops.push(TermOp::FullReset),
            b'D' => self.ops.push(TermOp::Index),
            b'E' => self.ops.push(TermOp::NextLine),
            b'M' => self.ops.push(TermOp::ReverseIndex),
            _ => self.unknown('E', u16::from(byte)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(bytes: &[u8]) -> Vec<TermOp> {
        Parser::new().feed(bytes)
    }

    #[test]
    fn plain_text() {
        assert_eq!(
            ops(b"Hi"),
            vec![TermOp::Print('H'), TermOp::Print('i')]
        );
    }

    #[test]
    fn utf8_across_calls() {
        let mut p = Parser::new();
        let bytes = "\u{4f60}".as_bytes();
        let mut all = p.feed(&bytes[..1]);
        all.extend(p.feed(&bytes[1..]));
        assert_eq!(all, vec![TermOp::Print('\u{4f60}')]);
    }

    #[test]
    fn cursor_position_is_zero_based() {
        assert_eq!(ops(b"\x1b[3;5H"), vec![TermOp::SetCursor { x: 4, y: 2 }]);
        // Missing params default to 1;1.
        assert_eq!(ops(b"\x1b[H"), vec![TermOp::SetCursor { x: 0, y: 0 }]);
    }

    #[test]
    fn cursor_moves_default_to_one() {
        assert_eq!(ops(b"\x1b[A"), vec![TermOp::CursorUp(1)]);
        assert_eq!(ops(b"\x1b[7B"), vec![TermOp::CursorDown(7)]);
    }

    #[test]
    fn sgr_reset_on_empty() {
        assert_eq!(ops(b"\x1b[m"), vec![TermOp::Sgr(vec![SgrOp::Reset])]);
        assert_eq!(ops(b"\x1b[0m"), vec![TermOp::Sgr(vec![SgrOp::Reset])]);
    }

    #[test]
    fn sgr_named_and_attrs() {
        assert_eq!(
            ops(b"\x1b[1;31m"),
            vec![TermOp::Sgr(vec![
                SgrOp::Set(Attrs::BOLD),
                SgrOp::Fg(Color::Named(NamedColor::Red)),
            ])]
        );
    }

    #[test]
    fn sgr_256_and_truecolor_semicolon_form() {
        assert_eq!(
            ops(b"\x1b[38;5;42m"),
            vec![TermOp::Sgr(vec![SgrOp::Fg(Color::Indexed(42))])]
        );
        assert_eq!(
            ops(b"\x1b[48;2;1;2;3m"),
            vec![TermOp::Sgr(vec![SgrOp::Bg(Color::Rgb { r: 1, g: 2, b: 3 })])]
        );
    }

    #[test]
    fn sgr_colon_subparam_form() {
        assert_eq!(
            ops(b"\x1b[38:5:99m"),
            vec![TermOp::Sgr(vec![SgrOp::Fg(Color::Indexed(99))])]
        );
    }

    #[test]
    fn sgr_bright_colors() {
        assert_eq!(
            ops(b"\x1b[91m"),
            vec![TermOp::Sgr(vec![SgrOp::Fg(Color::Named(
                NamedColor::BrightRed
            ))])]
        );
    }

    #[test]
    fn decset_alt_screen_and_paste() {
        assert_eq!(
            ops(b"\x1b[?1049h\x1b[?2004l"),
            vec![
                TermOp::SetMode(Mode::AltScreenSaveCursor, true),
                TermOp::SetMode(Mode::BracketedPaste, false),
            ]
        );
    }

    #[test]
    fn decset_multiple_params() {
        assert_eq!(
            ops(b"\x1b[?1000;1006h"),
            vec![
                TermOp::SetMode(Mode::MouseClick, true),
                TermOp::SetMode(Mode::MouseSgrEncoding, true),
            ]
        );
    }

    #[test]
    fn erase_ops() {
        assert_eq!(ops(b"\x1b[2J"), vec![TermOp::EraseInDisplay(EraseMode::All)]);
        assert_eq!(ops(b"\x1b[K"), vec![TermOp::EraseInLine(EraseMode::ToEnd)]);
        assert_eq!(
            ops(b"\x1b[3J"),
            vec![TermOp::EraseInDisplay(EraseMode::AllAndScrollback)]
        );
    }

    #[test]
    fn osc_title_bel_and_st() {
        assert_eq!(
            ops(b"\x1b]2;hello\x07"),
            vec![TermOp::Title("hello".into())]
        );
        assert_eq!(
            ops(b"\x1b]0;world\x1b\\"),
            vec![TermOp::Title("world".into())]
        );
    }

    #[test]
    fn osc8_hyperlink_open_and_close() {
        assert_eq!(
            ops(b"\x1b]8;id=x;https://example.com\x1b\\"),
            vec![TermOp::Hyperlink {
                params_id: Some("x".into()),
                uri: Some("https://example.com".into()),
            }]
        );
        assert_eq!(
            ops(b"\x1b]8;;\x1b\\"),
            vec![TermOp::Hyperlink {
                params_id: None,
                uri: None,
            }]
        );
    }

    #[test]
    fn dcs_sixel_payload_collected() {
        let result = ops(b"\x1bPq#0;2;0;0;0~~\x1b\\");
        assert_eq!(result, vec![TermOp::Sixel(b"#0;2;0;0;0~~".to_vec())]);
    }

    #[test]
    fn dsr_and_da1() {
        assert_eq!(ops(b"\x1b[6n"), vec![TermOp::DeviceStatusReport]);
        assert_eq!(ops(b"\x1b[c"), vec![TermOp::PrimaryDeviceAttributes]);
    }

    #[test]
    fn esc_save_restore_and_reset() {
        assert_eq!(
            ops(b"\x1b7\x1b8\x1bc"),
            vec![TermOp::SaveCursor, TermOp::RestoreCursor, TermOp::FullReset]
        );
    }

    #[test]
    fn scroll_region() {
        assert_eq!(
            ops(b"\x1b[2;10r"),
            vec![TermOp::SetScrollRegion {
                top: 1,
                bottom: Some(9),
            }]
        );
        assert_eq!(
            ops(b"\x1b[r"),
            vec![TermOp::SetScrollRegion {
                top: 0,
                bottom: None,
            }]
        );
    }

    #[test]
    fn malformed_sequence_resyncs() {
        // An OSC without terminator followed by a BEL-terminated one.
        let result = ops(b"\x1b]999;junk\x07A");
        assert_eq!(result, vec![TermOp::Print('A')]);
    }

    #[test]
    fn controls_between_text() {
        assert_eq!(
            ops(b"a\r\nb"),
            vec![
                TermOp::Print('a'),
                TermOp::CarriageReturn,
                TermOp::LineFeed,
                TermOp::Print('b'),
            ]
        );
    }
}
