//! Off-screen cell buffers the renderer draws into.

mod cache;
mod composite;
mod diff;

pub use cache::{CacheStats, RenderCache};
pub use composite::{CompositeSurface, Layer};
pub use diff::{AnsiEncoder, Comparer, DiffRun, GAP_COALESCE, SurfaceDiff};

use braid_term::{Cell, Grid, Style, graphemes};

use crate::geometry::{Rect, Size};

/// An addressable styled-cell buffer.
///
/// Surfaces share the terminal cell model (including wide graphemes and
/// continuation cells) but are freestanding: no cursor, no modes, no
/// scrollback. The renderer builds each frame on surfaces; the diff
/// encoder is the only thing that turns them into bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    grid: Grid,
}

impl Surface {
    /// Create an all-blank surface.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            grid: Grid::new(width, height),
        }
    }

    /// Surface width in columns.
    pub fn width(&self) -> u16 {
        self.grid.width()
    }

    /// Surface height in rows.
    pub fn height(&self) -> u16 {
        self.grid.height()
    }

    /// Surface dimensions.
    pub fn size(&self) -> Size {
        Size::new(self.grid.width(), self.grid.height())
    }

    /// Borrow a cell. Out-of-range coordinates return `None`.
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.grid.get(x, y)
    }

    /// Overwrite a cell, repairing any wide pair it breaks. Writes off
    /// the surface are dropped.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        self.grid.set(x, y, cell);
    }

    /// Write a string at `(x, y)`. Handles wide graphemes; never wraps.
    /// Returns the column after the last cell written.
    pub fn write_text(&mut self, x: u16, y: u16, text: &str, style: &Style) -> u16 {
        let mut col = x;
        for g in graphemes(text) {
            let w = braid_term::display_width(g);
            if w == 0 {
                self.grid.combine_grapheme(col.saturating_sub(1), y, g);
                continue;
            }
            if col >= self.width() || col + u16::from(w) > self.width() {
                break;
            }
            let advance = self.grid.write_grapheme(col, y, g, style.clone());
            if advance == 0 {
                break;
            }
            col += u16::from(advance);
        }
        col
    }

    /// Fill a rectangle with copies of a cell, clipped to the surface.
    pub fn fill(&mut self, rect: Rect, cell: &Cell) {
        let x1 = rect.right().min(self.width());
        let y1 = rect.bottom().min(self.height());
        for y in rect.y()..y1 {
            for x in rect.x()..x1 {
                self.set(x, y, cell.clone());
            }
        }
    }

    /// Blit `src` onto `self` at the given offset (which may be
    /// negative), clipped to bounds. Per-cell overwrite; continuation
    /// cells travel with their wide head, and a head that would be
    /// clipped at the right edge becomes a blank.
    pub fn composite(&mut self, src: &Surface, dx: i32, dy: i32) {
        for sy in 0..src.height() {
            let ty = i32::from(sy) + dy;
            if ty < 0 || ty >= i32::from(self.height()) {
                continue;
            }
            let mut sx = 0u16;
            while sx < src.width() {
                let Some(cell) = src.get(sx, sy) else { break };
                let w = cell.width.max(1);
                let tx = i32::from(sx) + dx;
                if cell.is_continuation() {
                    sx += 1;
                    continue;
                }
                if tx >= 0 && tx < i32::from(self.width()) {
                    let tx = tx as u16;
                    if cell.is_wide() && tx + 1 >= self.width() {
                        self.set(tx, ty as u16, Cell::empty());
                    } else {
                        self.set(tx, ty as u16, cell.clone());
                    }
                }
                sx += u16::from(w);
            }
        }
    }

    /// Build a surface from a terminal snapshot's visible screen.
    ///
    /// Cells are cloned with their styles and tracked handles, so a
    /// child terminal's content can enter the ordinary render/diff
    /// pipeline (and its hyperlinks survive into the output stream).
    pub fn from_snapshot(snapshot: &braid_term::TermSnapshot) -> Self {
        let mut surface = Surface::new(snapshot.width, snapshot.height);
        for (y, row) in snapshot.screen.iter().enumerate() {
            for (x, cell) in row.cells.iter().enumerate() {
                // Wide heads re-stamp their own continuation on `set`.
                if !cell.is_continuation() {
                    surface.set(x as u16, y as u16, cell.clone());
                }
            }
        }
        surface
    }

    /// Plain text of the surface, one line per row, right-trimmed.
    pub fn to_text(&self) -> String {
        self.grid.text()
    }

    /// Rows of the surface, top to bottom.
    pub fn rows(&self) -> &[braid_term::Row] {
        self.grid.rows()
    }
}
