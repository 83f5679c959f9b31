//! Input routing: hit-testing, keyboard dispatch, wheel routing.

pub mod chords;
pub mod focus;

pub use chords::{Binding, ChordAction, ChordMatcher, ChordResult, DEFAULT_CHORD_TIMEOUT};
pub use focus::FocusRing;

use tracing::warn;

use crate::error::Result;
use crate::event::{KeyCode, KeyEvent};
use crate::geometry::Position;
use crate::node::{NodeArena, NodeId, NodeState};
use crate::widget::Widget;

/// Find the mouse target at `(x, y)`.
///
/// Iterates the focus ring in reverse: the ring is in document order,
/// and for overlapping widgets the later one renders on top, so the
/// last containing entry wins.
pub fn hit_test(arena: &NodeArena, ring: &FocusRing, x: u16, y: u16) -> Option<NodeId> {
    let point = Position::new(x, y);
    ring.order()
        .iter()
        .rev()
        .copied()
        .find(|&id| {
            arena
                .get(id)
                .is_some_and(|n| n.hit_bounds.contains(point))
        })
}

/// Find the innermost scroll region containing `(x, y)`, for wheel
/// routing.
pub fn scroll_target(arena: &NodeArena, root: NodeId, x: u16, y: u16) -> Option<NodeId> {
    let point = Position::new(x, y);
    arena
        .doc_order(root)
        .into_iter()
        .filter(|&id| {
            arena.get(id).is_some_and(|n| {
                matches!(n.widget, Widget::Scroll(_)) && n.hit_bounds.contains(point)
            })
        })
        // Pre-order puts descendants after ancestors: the last match is
        // the innermost.
        .last()
}

/// Scroll a region by `delta` rows (negative = up). Returns whether the
/// offset changed.
pub fn handle_wheel(arena: &mut NodeArena, id: NodeId, delta: i16) -> bool {
    let Some(node) = arena.get_mut(id) else {
        return false;
    };
    if let NodeState::Scroll(state) = &mut node.state {
        let old = state.offset;
        state.offset = if delta < 0 {
            state.offset.saturating_sub(delta.unsigned_abs())
        } else {
            // Clamped against content height at the next arrange.
            state.offset.saturating_add(delta as u16)
        };
        if state.offset != old {
            node.dirty = true;
            return true;
        }
    }
    false
}

/// Dispatch a key to a node's own handler. Returns whether the node
/// consumed it. Handler failures are logged here and reported to the
/// caller; they never tear down the loop.
pub fn handle_key(arena: &mut NodeArena, id: NodeId, key: &KeyEvent) -> Result<bool> {
    let Some(node) = arena.get_mut(id) else {
        return Ok(false);
    };
    match (&node.widget.clone(), &mut node.state) {
        (Widget::Button(config), _) => match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                let on_press = config.on_press.clone();
                node.dirty = true;
                on_press.call(())?;
                Ok(true)
            }
            _ => Ok(false),
        },
        (Widget::TextBox(config), NodeState::TextBox(state)) => {
            let mut changed = false;
            let consumed = match key.code {
                KeyCode::Char(c) if !key.has_ctrl() && !key.has_alt() => {
                    let at = byte_index(&state.text, state.cursor);
                    state.text.insert(at, c);
                    state.cursor += 1;
                    changed = true;
                    true
                }
                KeyCode::Backspace => {
                    if state.cursor > 0 {
                        state.cursor -= 1;
                        let at = byte_index(&state.text, state.cursor);
                        state.text.remove(at);
                        changed = true;
                    }
                    true
                }
                KeyCode::Delete => {
                    if state.cursor < state.text.chars().count() {
                        let at = byte_index(&state.text, state.cursor);
                        state.text.remove(at);
                        changed = true;
                    }
                    true
                }
                KeyCode::Left => {
                    state.cursor = state.cursor.saturating_sub(1);
                    true
                }
                KeyCode::Right => {
                    state.cursor = (state.cursor + 1).min(state.text.chars().count());
                    true
                }
                KeyCode::Home => {
                    state.cursor = 0;
                    true
                }
                KeyCode::End => {
                    state.cursor = state.text.chars().count();
                    true
                }
                KeyCode::Enter => {
                    let text = state.text.clone();
                    let on_submit = config.on_submit.clone();
                    node.dirty = true;
                    on_submit.call(text)?;
                    return Ok(true);
                }
                _ => false,
            };
            if consumed {
                node.dirty = true;
            }
            if changed {
                let text = state.text.clone();
                let on_change = config.on_change.clone();
                on_change.call(text)?;
            }
            Ok(consumed)
        }
        (Widget::List(config), NodeState::List(state)) => {
            let len = config.items.len();
            let viewport = node.bounds.height() as usize;
            let consumed = match key.code {
                KeyCode::Up => {
                    state.selected = state.selected.saturating_sub(1);
                    true
                }
                KeyCode::Down => {
                    state.selected = (state.selected + 1).min(len.saturating_sub(1));
                    true
                }
                KeyCode::Home => {
                    state.selected = 0;
                    true
                }
                KeyCode::End => {
                    state.selected = len.saturating_sub(1);
                    true
                }
                KeyCode::Enter => {
                    let on_select = config.on_select.clone();
                    let index = state.selected;
                    node.dirty = true;
                    on_select.call(index)?;
                    return Ok(true);
                }
                _ => false,
            };
            if consumed {
                // Keep the selection visible.
                if state.selected < state.offset {
                    state.offset = state.selected;
                } else if viewport > 0 && state.selected >= state.offset + viewport {
                    state.offset = state.selected + 1 - viewport;
                }
                node.dirty = true;
            }
            Ok(consumed)
        }
        (Widget::Picker(config), NodeState::Picker(state)) => {
            let len = config.options.len();
            if len == 0 {
                return Ok(false);
            }
            let changed = match key.code {
                KeyCode::Left => {
                    state.selected = state.selected.checked_sub(1).unwrap_or(len - 1);
                    true
                }
                KeyCode::Right => {
                    state.selected = (state.selected + 1) % len;
                    true
                }
                _ => false,
            };
            if changed {
                let on_pick = config.on_pick.clone();
                let index = state.selected;
                node.dirty = true;
                on_pick.call(index)?;
            }
            Ok(changed)
        }
        (Widget::Table(config), NodeState::Table(state)) => {
            let len = config.rows.len();
            let viewport = node.bounds.height().saturating_sub(1) as usize;
            let consumed = match key.code {
                KeyCode::Up => {
                    state.selected = state.selected.saturating_sub(1);
                    true
                }
                KeyCode::Down => {
                    state.selected = (state.selected + 1).min(len.saturating_sub(1));
                    true
                }
                KeyCode::Enter => {
                    let on_select = config.on_select.clone();
                    let index = state.selected;
                    node.dirty = true;
                    on_select.call(index)?;
                    return Ok(true);
                }
                _ => false,
            };
            if consumed {
                if state.selected < state.offset {
                    state.offset = state.selected;
                } else if viewport > 0 && state.selected >= state.offset + viewport {
                    state.offset = state.selected + 1 - viewport;
                }
                node.dirty = true;
            }
            Ok(consumed)
        }
        _ => Ok(false),
    }
}

/// Deliver a mouse press to a node with coordinates relative to its
/// hit bounds. Returns whether the node consumed it.
pub fn handle_click(arena: &mut NodeArena, id: NodeId, rel_x: u16, rel_y: u16) -> Result<bool> {
    let Some(node) = arena.get_mut(id) else {
        return Ok(false);
    };
    match (&node.widget.clone(), &mut node.state) {
        (Widget::Button(config), _) => {
            let on_press = config.on_press.clone();
            node.dirty = true;
            on_press.call(())?;
            Ok(true)
        }
        (Widget::TextBox(_), NodeState::TextBox(state)) => {
            state.cursor = (rel_x as usize).min(state.text.chars().count());
            node.dirty = true;
            Ok(true)
        }
        (Widget::List(config), NodeState::List(state)) => {
            let index = state.offset + rel_y as usize;
            if index < config.items.len() {
                state.selected = index;
                node.dirty = true;
                let on_select = config.on_select.clone();
                on_select.call(index)?;
            }
            Ok(true)
        }
        (Widget::Table(config), NodeState::Table(state)) => {
            // Row 0 is the header.
            if rel_y == 0 {
                return Ok(true);
            }
            let index = state.offset + rel_y as usize - 1;
            if index < config.rows.len() {
                state.selected = index;
                node.dirty = true;
                let on_select = config.on_select.clone();
                on_select.call(index)?;
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Deliver pasted text to a node (text boxes accept it verbatim).
pub fn handle_paste(arena: &mut NodeArena, id: NodeId, text: &str) -> Result<bool> {
    let Some(node) = arena.get_mut(id) else {
        return Ok(false);
    };
    match (&node.widget.clone(), &mut node.state) {
        (Widget::TextBox(config), NodeState::TextBox(state)) => {
            let at = byte_index(&state.text, state.cursor);
            state.text.insert_str(at, text);
            state.cursor += text.chars().count();
            node.dirty = true;
            let new_text = state.text.clone();
            config.on_change.clone().call(new_text)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Route a handler error without tearing anything down.
pub fn report_handler_error(err: &crate::error::BraidError) {
    warn!(error = %err, "input handler failed");
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
