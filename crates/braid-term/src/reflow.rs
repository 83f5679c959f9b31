//! Re-wrapping of soft-wrapped logical lines on resize.
//!
//! The primary screen plus scrollback form one ordered sequence of rows.
//! Rows chained by the soft-wrap marker are one *logical line*; resizing
//! re-wraps each logical line at the new width and re-partitions the
//! result into scrollback and screen. Content is never dropped by a
//! resize: rows that no longer fit on screen move into scrollback (up to
//! its cap).

use std::collections::VecDeque;

use crate::cell::Cell;
use crate::grid::Row;
use crate::style::Attrs;

/// How content is preserved across a resize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReflowStrategy {
    /// Crop or extend; no re-wrapping. Cursor clamped.
    #[default]
    None,
    /// Re-wrap; keep the bottom of the content at the bottom of the
    /// screen. The saved cursor is clamped, not re-flowed.
    BottomFill,
    /// Re-wrap; keep the cursor's visual row stable when possible. The
    /// saved cursor is re-flowed along with the content.
    CursorAnchored,
}

impl ReflowStrategy {
    /// Whether this strategy re-wraps logical lines (and therefore cares
    /// about soft-wrap markers staying accurate).
    pub fn rewraps(self) -> bool {
        !matches!(self, ReflowStrategy::None)
    }
}

/// Result of re-wrapping: the new buffers and cursor positions.
pub(crate) struct ReflowOutcome {
    pub scrollback: VecDeque<Row>,
    pub screen: Vec<Row>,
    /// New cursor position; `x` may equal the new width (pending wrap).
    pub cursor: (u16, u16),
    /// Re-flowed saved cursor (only meaningful for `CursorAnchored`).
    pub saved: (u16, u16),
}

/// Re-wrap scrollback + screen at `new_width` and partition into a
/// `new_height` screen per `strategy` (which must be a re-wrapping one).
pub(crate) fn rewrap(
    scrollback: &VecDeque<Row>,
    screen: &[Row],
    cursor: (u16, u16),
    saved: (u16, u16),
    new_width: u16,
    new_height: u16,
    scrollback_cap: usize,
    strategy: ReflowStrategy,
) -> ReflowOutcome {
    let had_scrollback = !scrollback.is_empty();
    let cursor_flat = scrollback.len() + cursor.1 as usize;
    let saved_flat = scrollback.len() + saved.1 as usize;

    // Step 1+2: coalesce rows into logical lines. A soft-wrapped row
    // contributes all of its cells (trailing blanks are content there);
    // the final row of a line is right-trimmed.
    let mut lines: Vec<Vec<Cell>> = Vec::new();
    // (line index, columns contributed by earlier rows of that line)
    let mut row_coords: Vec<(usize, usize)> = Vec::new();
    let mut current: Vec<Cell> = Vec::new();
    for row in scrollback.iter().chain(screen.iter()) {
        row_coords.push((lines.len(), current.len()));
        let wrapped = row.is_soft_wrapped();
        let take = if wrapped {
            row.cells.len()
        } else {
            row.trimmed_len()
        };
        current.extend(row.cells[..take].iter().cloned().map(|mut c| {
            c.style.attrs.remove(Attrs::SOFT_WRAP);
            c
        }));
        if !wrapped {
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    // Step 3: locate the cursor as (logical line, cell index within it).
    let locate = |flat_row: usize, col: u16| -> (usize, usize) {
        let (line, cols_before) = row_coords
            .get(flat_row)
            .copied()
            .unwrap_or((lines.len().saturating_sub(1), 0));
        let target_col = cols_before + col as usize;
        let cells = lines.get(line).map(Vec::as_slice).unwrap_or(&[]);
        let mut col_pos = 0usize;
        let mut index = 0usize;
        for cell in cells.iter().filter(|c| !c.is_continuation()) {
            if col_pos >= target_col {
                break;
            }
            col_pos += cell.width.max(1) as usize;
            index += 1;
        }
        (line, index)
    };
    let (cursor_line, cursor_cell) = locate(cursor_flat, cursor.0);
    let (saved_line, saved_cell) = locate(saved_flat, saved.0);

    // Step 4: re-wrap each logical line at the new width.
    let width = new_width.max(1);
    let mut flat: Vec<Row> = Vec::new();
    let mut new_cursor: Option<(usize, u16)> = None;
    let mut new_saved: Option<(usize, u16)> = None;
    for (li, cells) in lines.iter().enumerate() {
        let cursor_here = (li == cursor_line).then_some(cursor_cell);
        let saved_here = (li == saved_line).then_some(saved_cell);
        let mut row_cells: Vec<Cell> = Vec::new();
        let mut col: u16 = 0;
        let mut heads = 0usize;
        let mut flush = |row_cells: &mut Vec<Cell>, flat: &mut Vec<Row>, wrapped: bool| {
            row_cells.resize(width as usize, Cell::empty());
            let mut row = Row {
                cells: std::mem::take(row_cells),
            };
            row.set_soft_wrap(wrapped);
            flat.push(row);
        };
        for cell in cells.iter().filter(|c| !c.is_continuation()) {
            let w = u16::from(cell.width.max(1));
            if col + w > width {
                // Step 4: wide graphemes are never split; pad and wrap.
                flush(&mut row_cells, &mut flat, true);
                col = 0;
            }
            if cursor_here == Some(heads) {
                new_cursor = Some((flat.len(), col));
            }
            if saved_here == Some(heads) {
                new_saved = Some((flat.len(), col));
            }
            row_cells.push(cell.clone());
            if w == 2 {
                row_cells.push(Cell::continuation());
            }
            col += w;
            heads += 1;
        }
        // Positions past the last cell (cursor sitting in the phantom
        // column or on blank space beyond content).
        if cursor_here.is_some_and(|c| c >= heads) && new_cursor.is_none() {
            new_cursor = Some((flat.len(), col));
        }
        if saved_here.is_some_and(|c| c >= heads) && new_saved.is_none() {
            new_saved = Some((flat.len(), col));
        }
        flush(&mut row_cells, &mut flat, false);
    }
    if flat.is_empty() {
        flat.push(blank_row(width));
    }

    let (mut cursor_row, cursor_col) = new_cursor.unwrap_or((0, 0));
    let (saved_row, saved_col) = new_saved.unwrap_or((0, 0));
    if cursor_row >= flat.len() {
        cursor_row = flat.len() - 1;
    }

    // Step 6: trim trailing all-blank rows, but never the cursor's row.
    let last_content = flat
        .iter()
        .rposition(|r| !r.is_blank() || r.is_soft_wrapped())
        .unwrap_or(0);
    flat.truncate((last_content + 1).max(cursor_row + 1));

    // Partition into scrollback + screen.
    let h = new_height.max(1) as usize;
    let total = flat.len();
    let mut pad_top = 0usize;
    let start = if total <= h {
        if matches!(strategy, ReflowStrategy::BottomFill) && had_scrollback {
            pad_top = h - total;
        }
        0
    } else {
        total - h
    };

    let mut rest = flat.split_off(start);
    let mut new_scrollback: VecDeque<Row> = flat.into();
    while new_scrollback.len() > scrollback_cap {
        new_scrollback.pop_front();
    }
    let mut new_screen: Vec<Row> = Vec::with_capacity(h);
    for _ in 0..pad_top {
        new_screen.push(blank_row(width));
    }
    new_screen.append(&mut rest);
    while new_screen.len() < h {
        new_screen.push(blank_row(width));
    }

    let cursor_y = (pad_top + cursor_row.saturating_sub(start)).min(h - 1) as u16;
    let saved_y = (pad_top + saved_row.saturating_sub(start)).min(h - 1) as u16;
    ReflowOutcome {
        scrollback: new_scrollback,
        screen: new_screen,
        cursor: (cursor_col, cursor_y),
        saved: (saved_col.min(width.saturating_sub(1)), saved_y),
    }
}

fn blank_row(width: u16) -> Row {
    Row::new(width)
}
