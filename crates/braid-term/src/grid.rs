//! Row and grid buffers.

use crate::cell::{Cell, display_width};
use crate::style::{Attrs, Style};

/// One terminal row: an ordered run of cells.
///
/// Rows remember their own width because scrollback rows keep the width
/// they were captured at, which may differ from the current terminal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    /// The cells of this row.
    pub cells: Vec<Cell>,
}

impl Row {
    /// Create a blank row of the given width.
    pub fn new(width: u16) -> Self {
        Self {
            cells: vec![Cell::empty(); width as usize],
        }
    }

    /// Width this row was captured at.
    pub fn width(&self) -> u16 {
        self.cells.len() as u16
    }

    /// Whether this row soft-wrapped into the next one.
    pub fn is_soft_wrapped(&self) -> bool {
        self.cells
            .last()
            .is_some_and(|c| c.style.attrs.contains(Attrs::SOFT_WRAP))
    }

    /// Set or clear the soft-wrap marker on the last cell.
    pub fn set_soft_wrap(&mut self, wrapped: bool) {
        if let Some(last) = self.cells.last_mut() {
            last.style.attrs.set(Attrs::SOFT_WRAP, wrapped);
        }
    }

    /// Number of cells up to and including the last non-blank cell.
    pub fn trimmed_len(&self) -> usize {
        self.cells
            .iter()
            .rposition(|c| !c.is_blank() && !c.is_continuation())
            .map_or(0, |i| i + 1)
    }

    /// Returns true if every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.trimmed_len() == 0
    }

    /// Plain text of the row, continuation cells skipped, right-trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for cell in &self.cells[..self.trimmed_len()] {
            out.push_str(cell.visible());
        }
        out
    }
}

/// A fixed-size rectangular cell buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u16,
    height: u16,
    rows: Vec<Row>,
}

impl Grid {
    /// Create an all-blank grid.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            rows: (0..height).map(|_| Row::new(width)).collect(),
        }
    }

    /// Rebuild a grid from prepared rows (rows are padded or truncated
    /// to the given width).
    pub fn from_rows(width: u16, height: u16, mut rows: Vec<Row>) -> Self {
        for row in &mut rows {
            row.cells.resize(width as usize, Cell::empty());
        }
        rows.resize(height as usize, Row::new(width));
        Self {
            width,
            height,
            rows,
        }
    }

    /// Grid width in columns.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Grid height in rows.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Borrow a row.
    pub fn row(&self, y: u16) -> Option<&Row> {
        self.rows.get(y as usize)
    }

    /// Borrow a row mutably.
    pub fn row_mut(&mut self, y: u16) -> Option<&mut Row> {
        self.rows.get_mut(y as usize)
    }

    /// All rows, top to bottom.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Borrow a cell. Out-of-range coordinates return `None`.
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.rows.get(y as usize)?.cells.get(x as usize)
    }

    /// Borrow a cell mutably.
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        self.rows.get_mut(y as usize)?.cells.get_mut(x as usize)
    }

    /// Overwrite a cell, repairing any wide pair it breaks.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.break_wide_pair(x, y);
        if cell.is_wide() {
            self.break_wide_pair(x + 1, y);
        }
        let wide = cell.is_wide();
        if let Some(slot) = self.get_mut(x, y) {
            *slot = cell;
        }
        if wide {
            if x + 1 < self.width {
                if let Some(next) = self.get_mut(x + 1, y) {
                    *next = Cell::continuation();
                }
            } else if let Some(slot) = self.get_mut(x, y) {
                // A wide cell cannot live in the last column.
                *slot = Cell::empty();
            }
        }
    }

    /// Place a grapheme cluster at `(x, y)` with the given style.
    ///
    /// Returns the cursor advance (the cluster's display width), or 0 if
    /// the write was dropped: out-of-range coordinates, zero-width
    /// clusters, and wide clusters that would overflow the row are all
    /// the caller's problem to handle before calling.
    pub fn write_grapheme(&mut self, x: u16, y: u16, grapheme: &str, style: Style) -> u8 {
        let w = display_width(grapheme);
        if w == 0 || x >= self.width || y >= self.height {
            return 0;
        }
        if w == 2 && x + 1 >= self.width {
            return 0;
        }
        let mut cell = Cell::new(grapheme, style);
        cell.width = w;
        self.set(x, y, cell);
        w
    }

    /// Append a zero-width cluster (combining mark) to the cell at `(x, y)`.
    ///
    /// If the target is a continuation cell, the mark merges into the wide
    /// grapheme to its left.
    pub fn combine_grapheme(&mut self, x: u16, y: u16, grapheme: &str) {
        let x = if self.get(x, y).is_some_and(Cell::is_continuation) && x > 0 {
            x - 1
        } else {
            x
        };
        if let Some(cell) = self.get_mut(x, y) {
            if cell.width > 0 {
                cell.grapheme.push_str(grapheme);
            }
        }
    }

    /// Fill a row span with blank cells carrying the given style.
    pub fn clear_span(&mut self, y: u16, x0: u16, x1: u16, style: &Style) {
        let x1 = x1.min(self.width);
        if x0 > 0 {
            self.break_wide_pair(x0, y);
        }
        if x1 < self.width {
            self.break_wide_pair(x1, y);
        }
        for x in x0..x1 {
            if let Some(cell) = self.get_mut(x, y) {
                *cell = Cell::empty();
                cell.style = Style {
                    bg: style.bg,
                    ..Style::default()
                };
            }
        }
    }

    /// Replace a whole row with blanks.
    pub fn clear_row(&mut self, y: u16, style: &Style) {
        self.clear_span(y, 0, self.width, style);
    }

    /// Remove the row at `top` and insert a blank row at `bottom`,
    /// shifting rows in `[top, bottom]` up. Returns the evicted row.
    pub fn scroll_up_region(&mut self, top: u16, bottom: u16) -> Option<Row> {
        if top > bottom || bottom >= self.height {
            return None;
        }
        let evicted = self.rows.remove(top as usize);
        self.rows.insert(bottom as usize, Row::new(self.width));
        Some(evicted)
    }

    /// Remove the row at `bottom` and insert a blank row at `top`,
    /// shifting rows in `[top, bottom]` down.
    pub fn scroll_down_region(&mut self, top: u16, bottom: u16) {
        if top > bottom || bottom >= self.height {
            return;
        }
        self.rows.remove(bottom as usize);
        self.rows.insert(top as usize, Row::new(self.width));
    }

    /// Crop or extend to new dimensions without reflow.
    pub fn resize_clip(&mut self, width: u16, height: u16) {
        for row in &mut self.rows {
            if (row.cells.len() as u16) > width {
                row.cells.truncate(width as usize);
                // Never leave a dangling wide head at the new margin.
                if row.cells.last().is_some_and(|c| c.is_wide()) {
                    if let Some(last) = row.cells.last_mut() {
                        *last = Cell::empty();
                    }
                }
            } else {
                row.cells.resize(width as usize, Cell::empty());
            }
        }
        if (self.rows.len() as u16) > height {
            self.rows.truncate(height as usize);
        } else {
            while (self.rows.len() as u16) < height {
                self.rows.push(Row::new(width));
            }
        }
        self.width = width;
        self.height = height;
    }

    /// Plain text of the whole grid, one line per row, right-trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&row.text());
        }
        out
    }

    // If (x, y) is half of a wide pair, blank both halves.
    fn break_wide_pair(&mut self, x: u16, y: u16) {
        let Some(cell) = self.get(x, y) else { return };
        if cell.is_continuation() && x > 0 {
            if let Some(head) = self.get_mut(x - 1, y) {
                if head.is_wide() {
                    *head = Cell::empty();
                }
            }
            if let Some(tail) = self.get_mut(x, y) {
                *tail = Cell::empty();
            }
        } else if cell.is_wide() {
            if let Some(tail) = self.get_mut(x + 1, y) {
                if tail.is_continuation() {
                    *tail = Cell::empty();
                }
            }
            if let Some(head) = self.get_mut(x, y) {
                *head = Cell::empty();
            }
        }
    }
}
