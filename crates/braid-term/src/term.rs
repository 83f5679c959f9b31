//! The virtual terminal: applies parser operations to grids.
//!
//! One instance owns a primary grid, an alternate grid, bounded
//! scrollback, cursor and pen state, and the mode flags a full-screen
//! application toggles. It is mutated only through [`VirtualTerminal::feed`]
//! / [`VirtualTerminal::apply`] and through [`VirtualTerminal::resize`];
//! everything else reads.

use std::collections::VecDeque;

use tracing::debug;

use crate::cell::{Cell, display_width};
use crate::error::{Result, TermError};
use crate::grid::{Grid, Row};
use crate::parser::{EraseMode, Mode, Parser, SgrOp, TermOp};
use crate::reflow::{self, ReflowStrategy};
use crate::snapshot::TermSnapshot;
use crate::style::Style;
use crate::tracked::{Hyperlink, LinkHandle, SixelImage, TrackedTable};

/// Default scrollback cap, in rows.
pub const DEFAULT_SCROLLBACK: usize = 10_000;

const TAB_STOP: u16 = 8;

/// Cursor position. `x` may equal the terminal width when the cursor
/// sits in the phantom column awaiting a wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorPos {
    /// Column (0-based).
    pub x: u16,
    /// Row (0-based).
    pub y: u16,
}

/// Mouse reporting level requested by the application under emulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum MouseLevel {
    /// No mouse reporting.
    #[default]
    Off,
    /// Button presses only (1000).
    Click,
    /// Presses and drag motion (1002).
    Drag,
    /// All motion (1003).
    Motion,
}

/// Terminal mode flags.
#[derive(Clone, Debug)]
pub struct ModeFlags {
    /// DECAWM auto-wrap.
    pub wrap: bool,
    /// DECOM origin mode.
    pub origin: bool,
    /// DECTCEM cursor visible.
    pub cursor_visible: bool,
    /// Mouse reporting level.
    pub mouse: MouseLevel,
    /// SGR extended mouse encoding.
    pub mouse_sgr: bool,
    /// Focus in/out reporting.
    pub focus_reporting: bool,
    /// Bracketed paste.
    pub bracketed_paste: bool,
}

impl Default for ModeFlags {
    fn default() -> Self {
        Self {
            wrap: true,
            origin: false,
            cursor_visible: true,
            mouse: MouseLevel::Off,
            mouse_sgr: false,
            focus_reporting: false,
            bracketed_paste: false,
        }
    }
}

#[derive(Clone, Copy, Default)]
struct SavedCursor {
    x: u16,
    y: u16,
    origin: bool,
}

/// Sink for bytes the terminal sends back to the application under
/// emulation (DSR and DA replies).
pub type ReplySink = Box<dyn FnMut(&[u8]) + Send>;

/// An in-memory VT-compatible terminal.
pub struct VirtualTerminal {
    width: u16,
    height: u16,
    primary: Grid,
    alternate: Grid,
    alt_active: bool,
    scrollback: VecDeque<Row>,
    scrollback_cap: usize,
    cursor: CursorPos,
    pending_wrap: bool,
    saved_primary: SavedCursor,
    saved_alt: SavedCursor,
    pen: Style,
    modes: ModeFlags,
    scroll_top: u16,
    scroll_bottom: u16,
    title: String,
    links: TrackedTable<Hyperlink>,
    sixels: TrackedTable<SixelImage>,
    active_link: Option<LinkHandle>,
    parser: Parser,
    reply: Option<ReplySink>,
    reflow: ReflowStrategy,
}

impl VirtualTerminal {
    /// Create a terminal of the given size with default scrollback and
    /// no reflow on resize.
    pub fn new(width: u16, height: u16) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TermError::InvalidInput(format!(
                "terminal size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            primary: Grid::new(width, height),
            alternate: Grid::new(width, height),
            alt_active: false,
            scrollback: VecDeque::new(),
            scrollback_cap: DEFAULT_SCROLLBACK,
            cursor: CursorPos::default(),
            pending_wrap: false,
            saved_primary: SavedCursor::default(),
            saved_alt: SavedCursor::default(),
            pen: Style::default(),
            modes: ModeFlags::default(),
            scroll_top: 0,
            scroll_bottom: height - 1,
            title: String::new(),
            links: TrackedTable::new(),
            sixels: TrackedTable::new(),
            active_link: None,
            parser: Parser::new(),
            reply: None,
            reflow: ReflowStrategy::None,
        })
    }

    /// Set the scrollback cap (rows). Excess rows are dropped oldest-first.
    #[must_use]
    pub fn with_scrollback(mut self, cap: usize) -> Self {
        self.scrollback_cap = cap;
        while self.scrollback.len() > cap {
            self.scrollback.pop_front();
        }
        self
    }

    /// Set the reflow strategy applied on resize.
    #[must_use]
    pub fn with_reflow(mut self, strategy: ReflowStrategy) -> Self {
        self.reflow = strategy;
        self
    }

    /// Install the sink that receives DSR/DA reply bytes.
    pub fn set_reply_sink(&mut self, sink: ReplySink) {
        self.reply = Some(sink);
    }

    /// Terminal width in columns.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Terminal height in rows.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The currently displayed grid.
    pub fn screen(&self) -> &Grid {
        if self.alt_active {
            &self.alternate
        } else {
            &self.primary
        }
    }

    /// The primary-screen grid regardless of which screen is active.
    pub fn primary(&self) -> &Grid {
        &self.primary
    }

    /// Scrollback rows, oldest first.
    pub fn scrollback(&self) -> &VecDeque<Row> {
        &self.scrollback
    }

    /// Cursor position; `x` equals the width while a wrap is pending.
    pub fn cursor(&self) -> CursorPos {
        CursorPos {
            x: if self.pending_wrap {
                self.width
            } else {
                self.cursor.x
            },
            y: self.cursor.y,
        }
    }

    /// Whether the alternate screen is active.
    pub fn is_alt_screen(&self) -> bool {
        self.alt_active
    }

    /// Current mode flags.
    pub fn modes(&self) -> &ModeFlags {
        &self.modes
    }

    /// Window title set via OSC 0/2.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Current reflow strategy.
    pub fn reflow_strategy(&self) -> ReflowStrategy {
        self.reflow
    }

    /// Number of live tracked hyperlinks.
    pub fn live_links(&self) -> usize {
        self.links.live_count()
    }

    /// Number of live tracked Sixel images.
    pub fn live_sixels(&self) -> usize {
        self.sixels.live_count()
    }

    /// Plain text of the visible screen, rows right-trimmed.
    pub fn screen_text(&self) -> String {
        self.screen().text()
    }

    /// Parse a byte chunk and apply every operation it decodes to.
    pub fn feed(&mut self, bytes: &[u8]) {
        let ops = self.parser.feed(bytes);
        for op in ops {
            self.apply(op);
        }
    }

    /// Apply a single operation.
    pub fn apply(&mut self, op: TermOp) {
        match op {
            TermOp::Print(c) => self.print(c),
            TermOp::LineFeed => self.linefeed(),
            TermOp::CarriageReturn => {
                self.cursor.x = 0;
                self.pending_wrap = false;
            }
            TermOp::Backspace => {
                self.cursor.x = self.cursor.x.saturating_sub(1);
                self.pending_wrap = false;
            }
            TermOp::Tab => {
                let next = (self.cursor.x / TAB_STOP + 1) * TAB_STOP;
                self.cursor.x = next.min(self.width - 1);
                self.pending_wrap = false;
            }
            TermOp::Bell => {}
            TermOp::CursorUp(n) => {
                let floor = if self.cursor.y >= self.scroll_top {
                    self.scroll_top
                } else {
                    0
                };
                self.cursor.y = self.cursor.y.saturating_sub(n).max(floor);
                self.pending_wrap = false;
            }
            TermOp::CursorDown(n) => {
                let ceil = if self.cursor.y <= self.scroll_bottom {
                    self.scroll_bottom
                } else {
                    self.height - 1
                };
                self.cursor.y = (self.cursor.y + n).min(ceil);
                self.pending_wrap = false;
            }
            TermOp::CursorForward(n) => {
                self.cursor.x = (self.cursor.x + n).min(self.width - 1);
                self.pending_wrap = false;
            }
            TermOp::CursorBack(n) => {
                self.cursor.x = self.cursor.x.saturating_sub(n);
                self.pending_wrap = false;
            }
            TermOp::CursorNextLine(n) => {
                self.apply(TermOp::CursorDown(n));
                self.cursor.x = 0;
            }
            TermOp::CursorPrevLine(n) => {
                self.apply(TermOp::CursorUp(n));
                self.cursor.x = 0;
            }
            TermOp::CursorColumn(x) => {
                self.cursor.x = x.min(self.width - 1);
                self.pending_wrap = false;
            }
            TermOp::CursorRow(y) => {
                let y = if self.modes.origin { y + self.scroll_top } else { y };
                self.move_cursor_absolute(self.cursor.x, y);
            }
            TermOp::SetCursor { x, y } => {
                let y = if self.modes.origin { y + self.scroll_top } else { y };
                self.move_cursor_absolute(x, y);
            }
            TermOp::Sgr(ops) => {
                for sgr in ops {
                    self.apply_sgr(sgr);
                }
            }
            TermOp::EraseInDisplay(mode) => self.erase_in_display(mode),
            TermOp::EraseInLine(mode) => self.erase_in_line(mode),
            TermOp::InsertLines(n) => self.insert_lines(n),
            TermOp::DeleteLines(n) => self.delete_lines(n),
            TermOp::InsertChars(n) => self.insert_chars(n),
            TermOp::DeleteChars(n) => self.delete_chars(n),
            TermOp::EraseChars(n) => {
                let (x, y) = (self.cursor.x, self.cursor.y);
                let pen = self.pen.clone();
                self.grid_mut().clear_span(y, x, x.saturating_add(n), &pen);
            }
            TermOp::ScrollUp(n) => self.scroll_up(n),
            TermOp::ScrollDown(n) => self.scroll_down(n),
            TermOp::SetScrollRegion { top, bottom } => {
                let bottom = bottom.unwrap_or(self.height - 1).min(self.height - 1);
                if top < bottom {
                    self.scroll_top = top;
                    self.scroll_bottom = bottom;
                    let home_y = if self.modes.origin { self.scroll_top } else { 0 };
                    self.move_cursor_absolute(0, home_y);
                }
            }
            TermOp::SaveCursor => self.save_cursor(),
            TermOp::RestoreCursor => self.restore_cursor(),
            TermOp::SetMode(mode, on) => self.set_mode(mode, on),
            TermOp::Hyperlink { params_id, uri } => {
                self.active_link = uri.map(|uri| self.links.register_link(params_id, uri));
            }
            TermOp::Title(title) => self.title = title,
            TermOp::Sixel(payload) => {
                let handle = self.sixels.register_sixel(payload, 1, 1);
                let (x, y) = (self.cursor.x, self.cursor.y);
                if let Some(cell) = self.grid_mut().get_mut(x, y) {
                    cell.sixel = Some(handle);
                }
            }
            TermOp::DeviceStatusReport => {
                let row = if self.modes.origin {
                    self.cursor.y - self.scroll_top + 1
                } else {
                    self.cursor.y + 1
                };
                let col = self.cursor.x + 1;
                self.send_reply(format!("\x1b[{row};{col}R").into_bytes());
            }
            TermOp::PrimaryDeviceAttributes => {
                self.send_reply(b"\x1b[?6c".to_vec());
            }
            TermOp::FullReset => self.full_reset(),
            TermOp::Index => self.linefeed(),
            TermOp::ReverseIndex => self.reverse_index(),
            TermOp::NextLine => {
                self.linefeed();
                self.cursor.x = 0;
            }
            _ => debug!(?op, "unhandled terminal op"),
        }
    }

    /// Resize the terminal, applying the configured reflow strategy to
    /// the primary screen. The alternate grid is cropped or extended.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(TermError::InvalidInput(format!(
                "terminal size must be non-zero, got {width}x{height}"
            )));
        }
        if width == self.width && height == self.height {
            return Ok(());
        }

        self.alternate.resize_clip(width, height);

        if self.reflow.rewraps() {
            // The primary cursor: live when the primary screen is shown,
            // otherwise the position saved on alt-screen entry.
            let primary_cursor = if self.alt_active {
                (self.saved_primary.x, self.saved_primary.y)
            } else {
                (self.cursor().x, self.cursor.y)
            };
            let saved = (self.saved_primary.x, self.saved_primary.y);
            let outcome = reflow::rewrap(
                &self.scrollback,
                self.primary.rows(),
                primary_cursor,
                saved,
                width,
                height,
                self.scrollback_cap,
                self.reflow,
            );
            self.scrollback = outcome.scrollback;
            self.primary = Grid::from_rows(width, height, outcome.screen);
            let (cx, cy) = outcome.cursor;
            if self.alt_active {
                self.saved_primary.x = cx.min(width - 1);
                self.saved_primary.y = cy;
                self.cursor.x = self.cursor.x.min(width - 1);
                self.cursor.y = self.cursor.y.min(height - 1);
                self.pending_wrap = false;
            } else {
                self.pending_wrap = cx >= width;
                self.cursor.x = cx.min(width - 1);
                self.cursor.y = cy.min(height - 1);
                match self.reflow {
                    ReflowStrategy::CursorAnchored => {
                        self.saved_primary.x = outcome.saved.0;
                        self.saved_primary.y = outcome.saved.1;
                    }
                    _ => {
                        self.saved_primary.x = self.saved_primary.x.min(width - 1);
                        self.saved_primary.y = self.saved_primary.y.min(height - 1);
                    }
                }
            }
        } else {
            self.primary.resize_clip(width, height);
            self.cursor.x = self.cursor.x.min(width - 1);
            self.cursor.y = self.cursor.y.min(height - 1);
            self.saved_primary.x = self.saved_primary.x.min(width - 1);
            self.saved_primary.y = self.saved_primary.y.min(height - 1);
            self.pending_wrap = false;
        }

        self.saved_alt.x = self.saved_alt.x.min(width - 1);
        self.saved_alt.y = self.saved_alt.y.min(height - 1);
        self.width = width;
        self.height = height;
        self.scroll_top = 0;
        self.scroll_bottom = height - 1;
        self.links.prune();
        self.sixels.prune();
        Ok(())
    }

    /// Take an immutable snapshot of the screen plus up to
    /// `scrollback_rows` of scrollback. Tracked objects stay alive for
    /// as long as the snapshot holds their cells.
    pub fn snapshot(&self, scrollback_rows: usize) -> TermSnapshot {
        let take = scrollback_rows.min(self.scrollback.len());
        let start = self.scrollback.len() - take;
        TermSnapshot {
            width: self.width,
            height: self.height,
            scrollback: self.scrollback.iter().skip(start).cloned().collect(),
            screen: self.screen().rows().to_vec(),
            cursor: self.cursor(),
            cursor_visible: self.modes.cursor_visible,
            title: self.title.clone(),
            alt_screen: self.alt_active,
        }
    }

    // ---------------------------
    // Internal: op application
    // ---------------------------

    fn grid_mut(&mut self) -> &mut Grid {
        if self.alt_active {
            &mut self.alternate
        } else {
            &mut self.primary
        }
    }

    fn send_reply(&mut self, bytes: Vec<u8>) {
        if let Some(sink) = self.reply.as_mut() {
            sink(&bytes);
        }
    }

    fn print(&mut self, c: char) {
        let mut buf = [0u8; 4];
        let s: &str = c.encode_utf8(&mut buf);
        let w = display_width(s);

        if w == 0 {
            // Combining mark: attach to the previously printed cell.
            let (x, y) = if self.pending_wrap {
                (self.width - 1, self.cursor.y)
            } else {
                (self.cursor.x.saturating_sub(1), self.cursor.y)
            };
            let owned = s.to_owned();
            self.grid_mut().combine_grapheme(x, y, &owned);
            return;
        }

        if self.pending_wrap {
            if self.modes.wrap {
                self.wrap_line();
            } else {
                self.pending_wrap = false;
                self.cursor.x = self.width - 1;
            }
        }

        if w == 2 && self.cursor.x == self.width - 1 {
            if !self.modes.wrap {
                return;
            }
            // A wide grapheme cannot straddle the margin: blank the last
            // column and wrap before placing it.
            let (x, y) = (self.cursor.x, self.cursor.y);
            self.grid_mut().set(x, y, Cell::empty());
            self.wrap_line();
        }

        let style = Style {
            fg: self.pen.fg,
            bg: self.pen.bg,
            attrs: self.pen.attrs.renditions(),
            link: self.active_link.clone(),
        };
        let (x, y) = (self.cursor.x, self.cursor.y);
        let owned = s.to_owned();
        let advance = self.grid_mut().write_grapheme(x, y, &owned, style);
        if advance == 0 {
            return;
        }
        let next = self.cursor.x + u16::from(advance);
        if next >= self.width {
            self.pending_wrap = true;
        } else {
            self.cursor.x = next;
        }
    }

    fn wrap_line(&mut self) {
        let y = self.cursor.y;
        if let Some(row) = self.grid_mut().row_mut(y) {
            row.set_soft_wrap(true);
        }
        self.pending_wrap = false;
        self.cursor.x = 0;
        self.linefeed();
    }

    fn linefeed(&mut self) {
        if self.cursor.y == self.scroll_bottom {
            self.scroll_up(1);
        } else if self.cursor.y < self.height - 1 {
            self.cursor.y += 1;
        }
        self.pending_wrap = false;
    }

    fn reverse_index(&mut self) {
        if self.cursor.y == self.scroll_top {
            self.scroll_down(1);
        } else {
            self.cursor.y = self.cursor.y.saturating_sub(1);
        }
        self.pending_wrap = false;
    }

    fn scroll_up(&mut self, n: u16) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        let to_history = !self.alt_active && top == 0;
        for _ in 0..n.min(self.height) {
            let evicted = self.grid_mut().scroll_up_region(top, bottom);
            if to_history {
                if let Some(row) = evicted {
                    self.scrollback.push_back(row);
                    while self.scrollback.len() > self.scrollback_cap {
                        self.scrollback.pop_front();
                    }
                }
            }
        }
    }

    fn scroll_down(&mut self, n: u16) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        for _ in 0..n.min(self.height) {
            self.grid_mut().scroll_down_region(top, bottom);
        }
    }

    fn move_cursor_absolute(&mut self, x: u16, y: u16) {
        let max_y = if self.modes.origin {
            self.scroll_bottom
        } else {
            self.height - 1
        };
        let new_y = y.min(max_y);
        // Absolute positioning breaks the logical-line chain: when the
        // reflow strategy re-wraps, later reflows must not merge content
        // above the jump with content printed after it.
        if self.reflow.rewraps() && new_y != self.cursor.y {
            let old_y = self.cursor.y;
            if let Some(row) = self.grid_mut().row_mut(old_y) {
                row.set_soft_wrap(false);
            }
        }
        self.cursor.x = x.min(self.width - 1);
        self.cursor.y = new_y;
        self.pending_wrap = false;
    }

    fn apply_sgr(&mut self, op: SgrOp) {
        match op {
            SgrOp::Reset => {
                self.pen = Style::default();
            }
            SgrOp::Set(attrs) => self.pen.attrs |= attrs,
            SgrOp::Clear(attrs) => self.pen.attrs &= !attrs,
            SgrOp::Fg(color) => self.pen.fg = Some(color),
            SgrOp::Bg(color) => self.pen.bg = Some(color),
            SgrOp::DefaultFg => self.pen.fg = None,
            SgrOp::DefaultBg => self.pen.bg = None,
        }
    }

    fn erase_in_display(&mut self, mode: EraseMode) {
        let pen = self.pen.clone();
        let (x, y) = (self.cursor.x, self.cursor.y);
        let (w, h) = (self.width, self.height);
        match mode {
            EraseMode::ToEnd => {
                self.grid_mut().clear_span(y, x, w, &pen);
                for row in y + 1..h {
                    self.grid_mut().clear_row(row, &pen);
                }
            }
            EraseMode::ToStart => {
                for row in 0..y {
                    self.grid_mut().clear_row(row, &pen);
                }
                self.grid_mut().clear_span(y, 0, x + 1, &pen);
            }
            EraseMode::All => {
                for row in 0..h {
                    self.grid_mut().clear_row(row, &pen);
                }
            }
            EraseMode::AllAndScrollback => {
                for row in 0..h {
                    self.grid_mut().clear_row(row, &pen);
                }
                self.scrollback.clear();
                self.links.prune();
                self.sixels.prune();
            }
        }
        self.pending_wrap = false;
    }

    fn erase_in_line(&mut self, mode: EraseMode) {
        let pen = self.pen.clone();
        let (x, y) = (self.cursor.x, self.cursor.y);
        let w = self.width;
        match mode {
            EraseMode::ToEnd => self.grid_mut().clear_span(y, x, w, &pen),
            EraseMode::ToStart => self.grid_mut().clear_span(y, 0, x + 1, &pen),
            EraseMode::All | EraseMode::AllAndScrollback => self.grid_mut().clear_row(y, &pen),
        }
        self.pending_wrap = false;
    }

    fn insert_lines(&mut self, n: u16) {
        if self.cursor.y < self.scroll_top || self.cursor.y > self.scroll_bottom {
            return;
        }
        let (y, bottom) = (self.cursor.y, self.scroll_bottom);
        for _ in 0..n.min(self.height) {
            self.grid_mut().scroll_down_region(y, bottom);
        }
        self.cursor.x = 0;
        self.pending_wrap = false;
    }

    fn delete_lines(&mut self, n: u16) {
        if self.cursor.y < self.scroll_top || self.cursor.y > self.scroll_bottom {
            return;
        }
        let (y, bottom) = (self.cursor.y, self.scroll_bottom);
        for _ in 0..n.min(self.height) {
            self.grid_mut().scroll_up_region(y, bottom);
        }
        self.cursor.x = 0;
        self.pending_wrap = false;
    }

    fn insert_chars(&mut self, n: u16) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        let w = self.width as usize;
        let n = (n as usize).min(w.saturating_sub(x as usize));
        if let Some(row) = self.grid_mut().row_mut(y) {
            for _ in 0..n {
                row.cells.insert(x as usize, Cell::empty());
                row.cells.truncate(w);
            }
        }
        self.pending_wrap = false;
    }

    fn delete_chars(&mut self, n: u16) {
        let (x, y) = (self.cursor.x, self.cursor.y);
        let w = self.width as usize;
        let n = (n as usize).min(w.saturating_sub(x as usize));
        if let Some(row) = self.grid_mut().row_mut(y) {
            for _ in 0..n {
                if (x as usize) < row.cells.len() {
                    row.cells.remove(x as usize);
                }
            }
            row.cells.resize(w, Cell::empty());
        }
        self.pending_wrap = false;
    }

    fn save_cursor(&mut self) {
        let saved = SavedCursor {
            x: self.cursor.x,
            y: self.cursor.y,
            origin: self.modes.origin,
        };
        if self.alt_active {
            self.saved_alt = saved;
        } else {
            self.saved_primary = saved;
        }
    }

    fn restore_cursor(&mut self) {
        let saved = if self.alt_active {
            self.saved_alt
        } else {
            self.saved_primary
        };
        self.cursor.x = saved.x.min(self.width - 1);
        self.cursor.y = saved.y.min(self.height - 1);
        self.modes.origin = saved.origin;
        self.pending_wrap = false;
    }

    fn set_mode(&mut self, mode: Mode, on: bool) {
        match mode {
            Mode::Wrap => {
                self.modes.wrap = on;
                if !on {
                    self.pending_wrap = false;
                }
            }
            Mode::Origin => {
                self.modes.origin = on;
                self.move_cursor_absolute(0, if on { self.scroll_top } else { 0 });
            }
            Mode::CursorVisible => self.modes.cursor_visible = on,
            Mode::AltScreen => self.switch_screen(on, false),
            Mode::AltScreenSaveCursor => self.switch_screen(on, true),
            Mode::MouseClick => self.set_mouse_level(MouseLevel::Click, on),
            Mode::MouseDrag => self.set_mouse_level(MouseLevel::Drag, on),
            Mode::MouseMotion => self.set_mouse_level(MouseLevel::Motion, on),
            Mode::MouseSgrEncoding => self.modes.mouse_sgr = on,
            Mode::FocusReporting => self.modes.focus_reporting = on,
            Mode::BracketedPaste => self.modes.bracketed_paste = on,
        }
    }

    fn set_mouse_level(&mut self, level: MouseLevel, on: bool) {
        if on {
            self.modes.mouse = self.modes.mouse.max(level);
        } else if self.modes.mouse == level || level == MouseLevel::Click {
            self.modes.mouse = MouseLevel::Off;
        }
    }

    fn switch_screen(&mut self, to_alt: bool, save_cursor: bool) {
        if to_alt == self.alt_active {
            return;
        }
        if to_alt {
            if save_cursor {
                self.save_cursor();
            }
            self.alt_active = true;
            // Entering the alternate screen always starts blank.
            self.alternate = Grid::new(self.width, self.height);
            self.cursor = CursorPos::default();
            self.pending_wrap = false;
        } else {
            self.alt_active = false;
            if save_cursor {
                self.restore_cursor();
            }
            self.pending_wrap = false;
        }
    }

    fn full_reset(&mut self) {
        self.primary = Grid::new(self.width, self.height);
        self.alternate = Grid::new(self.width, self.height);
        self.alt_active = false;
        self.scrollback.clear();
        self.cursor = CursorPos::default();
        self.pending_wrap = false;
        self.saved_primary = SavedCursor::default();
        self.saved_alt = SavedCursor::default();
        self.pen = Style::default();
        self.modes = ModeFlags::default();
        self.scroll_top = 0;
        self.scroll_bottom = self.height - 1;
        self.active_link = None;
        self.links.prune();
        self.sixels.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, NamedColor};
    use crate::style::Attrs;

    fn term(w: u16, h: u16) -> VirtualTerminal {
        match VirtualTerminal::new(w, h) {
            Ok(t) => t,
            Err(e) => panic!("terminal creation failed: {e}"),
        }
    }

    #[test]
    fn zero_size_rejected() {
        assert!(VirtualTerminal::new(0, 24).is_err());
        assert!(VirtualTerminal::new(80, 0).is_err());
    }

    #[test]
    fn plain_print_advances_cursor() {
        let mut t = term(10, 3);
        t.feed(b"Hi");
        assert_eq!(t.screen_text(), "Hi\n\n");
        assert_eq!(t.cursor(), CursorPos { x: 2, y: 0 });
    }

    #[test]
    fn crlf_moves_to_next_row() {
        let mut t = term(10, 3);
        t.feed(b"a\r\nb");
        assert_eq!(t.screen_text(), "a\nb\n");
    }

    #[test]
    fn soft_wrap_sets_marker() {
        let mut t = term(5, 3);
        t.feed(b"ABCDEFG");
        assert_eq!(t.screen_text(), "ABCDE\nFG\n");
        assert!(t.screen().row(0).is_some_and(Row::is_soft_wrapped));
        assert!(!t.screen().row(1).is_some_and(Row::is_soft_wrapped));
        assert_eq!(t.cursor(), CursorPos { x: 2, y: 1 });
    }

    #[test]
    fn wrap_disabled_overwrites_last_column() {
        let mut t = term(5, 1);
        t.feed(b"\x1b[?7l");
        t.feed(b"ABCDEFG");
        assert_eq!(t.screen_text(), "ABCDG");
    }

    #[test]
    fn wide_grapheme_wraps_whole() {
        let mut t = term(4, 2);
        t.feed("abc\u{4f60}".as_bytes());
        // 你 cannot straddle the margin: column 3 blanks and it wraps.
        assert_eq!(t.screen_text(), "abc\n\u{4f60}");
        assert!(t.screen().row(0).is_some_and(Row::is_soft_wrapped));
        assert_eq!(t.cursor(), CursorPos { x: 2, y: 1 });
    }

    #[test]
    fn scrolling_pushes_into_scrollback() {
        let mut t = term(5, 2);
        t.feed(b"a\r\nb\r\nc");
        assert_eq!(t.screen_text(), "b\nc");
        assert_eq!(t.scrollback().len(), 1);
        assert_eq!(t.scrollback()[0].text(), "a");
    }

    #[test]
    fn alt_screen_is_separate_and_discards() {
        let mut t = term(10, 3);
        t.feed(b"shell");
        t.feed(b"\x1b[?1049h");
        assert!(t.is_alt_screen());
        assert_eq!(t.screen_text(), "\n\n");
        t.feed(b"app");
        assert_eq!(t.screen_text(), "app\n\n");
        t.feed(b"\x1b[?1049l");
        assert!(!t.is_alt_screen());
        assert_eq!(t.screen_text(), "shell\n\n");
        assert_eq!(t.cursor(), CursorPos { x: 5, y: 0 });
    }

    #[test]
    fn alt_screen_entry_clears_previous_alt_content() {
        let mut t = term(10, 2);
        t.feed(b"\x1b[?1049hfirst\x1b[?1049l\x1b[?1049h");
        assert_eq!(t.screen_text(), "\n");
    }

    #[test]
    fn sgr_pen_applies_to_cells() {
        let mut t = term(10, 1);
        t.feed(b"\x1b[1;31mX\x1b[0mY");
        let x = t.screen().get(0, 0).cloned().unwrap_or_default();
        assert!(x.style.attrs.contains(Attrs::BOLD));
        assert_eq!(x.style.fg, Some(Color::Named(NamedColor::Red)));
        let y = t.screen().get(1, 0).cloned().unwrap_or_default();
        assert!(y.style.is_empty());
    }

    #[test]
    fn cursor_position_and_erase() {
        let mut t = term(10, 3);
        t.feed(b"aaaaa\r\nbbbbb\r\nccccc");
        t.feed(b"\x1b[2;3H\x1b[K");
        assert_eq!(t.screen_text(), "aaaaa\nbb\nccccc");
        t.feed(b"\x1b[2J");
        assert_eq!(t.screen_text(), "\n\n");
    }

    #[test]
    fn erase_scrollback_too() {
        let mut t = term(5, 1);
        t.feed(b"a\r\nb");
        assert_eq!(t.scrollback().len(), 1);
        t.feed(b"\x1b[3J");
        assert!(t.scrollback().is_empty());
    }

    #[test]
    fn save_restore_cursor() {
        let mut t = term(10, 3);
        t.feed(b"\x1b[2;4H\x1b7\x1b[Hx\x1b8");
        assert_eq!(t.cursor(), CursorPos { x: 3, y: 1 });
    }

    #[test]
    fn scroll_region_contains_scrolling() {
        let mut t = term(5, 4);
        t.feed(b"a\r\nb\r\nc\r\nd");
        // Region rows 1..=2; LF at the region bottom scrolls only it.
        t.feed(b"\x1b[2;3r\x1b[3;1H\n");
        assert_eq!(t.screen_text(), "a\nc\n\nd");
        // Region scrolling never reaches scrollback.
        assert!(t.scrollback().is_empty());
    }

    #[test]
    fn dsr_reports_cursor() {
        let mut t = term(10, 3);
        let replies = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&replies);
        t.set_reply_sink(Box::new(move |bytes| {
            if let Ok(mut r) = sink.lock() {
                r.extend_from_slice(bytes);
            }
        }));
        t.feed(b"\x1b[2;5H\x1b[6n");
        let got = replies.lock().map(|r| r.clone()).unwrap_or_default();
        assert_eq!(got, b"\x1b[2;5R");
    }

    #[test]
    fn title_from_osc() {
        let mut t = term(10, 1);
        t.feed(b"\x1b]2;my title\x07");
        assert_eq!(t.title(), "my title");
    }

    #[test]
    fn hyperlink_cells_carry_handle() {
        let mut t = term(20, 1);
        t.feed(b"\x1b]8;;https://example.com\x1b\\link\x1b]8;;\x1b\\plain");
        let linked = t.screen().get(0, 0).cloned().unwrap_or_default();
        assert!(linked.style.link.is_some());
        let plain = t.screen().get(4, 0).cloned().unwrap_or_default();
        assert!(plain.style.link.is_none());
        assert_eq!(t.live_links(), 1);
    }

    #[test]
    fn overwriting_link_cells_releases_object() {
        let mut t = term(4, 1);
        t.feed(b"\x1b]8;;https://a\x1b\\ab\x1b]8;;\x1b\\");
        assert_eq!(t.live_links(), 1);
        // Overwrite both linked cells, then drop the table's weak refs.
        t.feed(b"\rxy");
        assert_eq!(t.live_links(), 0);
    }

    #[test]
    fn resize_without_reflow_clips() {
        let mut t = term(10, 3);
        t.feed(b"0123456789");
        assert!(t.resize(5, 2).is_ok());
        assert_eq!(t.screen_text(), "01234\n");
        assert!(t.resize(0, 5).is_err());
    }

    #[test]
    fn resize_reflow_scenario() {
        // 5 cols "ABCDEFG" -> widen to 7 (line merges) -> narrow to 3.
        let mut t = term(5, 4).with_reflow(ReflowStrategy::CursorAnchored);
        t.feed(b"ABCDEFG");
        assert!(t.resize(7, 4).is_ok());
        assert_eq!(t.screen_text(), "ABCDEFG\n\n\n");
        assert!(!t.screen().row(0).is_some_and(Row::is_soft_wrapped));
        assert_eq!(t.cursor(), CursorPos { x: 7, y: 0 });

        assert!(t.resize(3, 4).is_ok());
        assert_eq!(t.screen_text(), "ABC\nDEF\nG\n");
        assert!(t.screen().row(0).is_some_and(Row::is_soft_wrapped));
        assert!(t.screen().row(1).is_some_and(Row::is_soft_wrapped));
        assert!(!t.screen().row(2).is_some_and(Row::is_soft_wrapped));
    }

    #[test]
    fn absolute_move_breaks_logical_chain() {
        let mut t = term(5, 4).with_reflow(ReflowStrategy::CursorAnchored);
        t.feed(b"ABCDEFG");
        // Jump away from the wrapped line's tail row.
        t.feed(b"\x1b[4;1Hx");
        assert!(!t.screen().row(1).is_some_and(Row::is_soft_wrapped));
        // Row 0 keeps its marker: the jump left row 1, not row 0.
        assert!(t.screen().row(0).is_some_and(Row::is_soft_wrapped));
    }

    #[test]
    fn mouse_modes_tracked() {
        let mut t = term(5, 2);
        t.feed(b"\x1b[?1002h\x1b[?1006h");
        assert_eq!(t.modes().mouse, MouseLevel::Drag);
        assert!(t.modes().mouse_sgr);
        t.feed(b"\x1b[?1002l");
        assert_eq!(t.modes().mouse, MouseLevel::Off);
    }

    #[test]
    fn full_reset_clears_everything() {
        let mut t = term(5, 2);
        t.feed(b"a\r\nb\r\nc\x1b[1m\x1b]2;t\x07");
        t.feed(b"\x1bc");
        assert_eq!(t.screen_text(), "\n");
        assert!(t.scrollback().is_empty());
        assert_eq!(t.cursor(), CursorPos { x: 0, y: 0 });
    }

    #[test]
    fn snapshot_holds_tracked_objects() {
        let mut t = term(4, 1);
        t.feed(b"\x1b]8;;https://a\x1b\\ab\x1b]8;;\x1b\\");
        let snap = t.snapshot(0);
        // Overwrite on screen; the snapshot still pins the link.
        t.feed(b"\rxy");
        assert_eq!(t.live_links(), 1);
        drop(snap);
        assert_eq!(t.live_links(), 0);
    }

    #[test]
    fn insert_delete_chars() {
        let mut t = term(6, 1);
        t.feed(b"abcdef\r");
        t.feed(b"\x1b[2@");
        assert_eq!(t.screen_text(), "  abcd");
        t.feed(b"\x1b[2P");
        assert_eq!(t.screen_text(), "abcd");
    }

    #[test]
    fn insert_delete_lines() {
        let mut t = term(3, 3);
        t.feed(b"a\r\nb\r\nc\x1b[2;1H");
        t.feed(b"\x1b[L");
        assert_eq!(t.screen_text(), "a\n\nb");
        t.feed(b"\x1b[M");
        assert_eq!(t.screen_text(), "a\nb\n");
    }
}
