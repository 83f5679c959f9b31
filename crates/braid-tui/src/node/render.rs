//! Render pass: nodes draw onto surfaces.
//!
//! Every node renders into a surface of its own bounds size; parents
//! composite child surfaces at their relative offsets. The render cache
//! short-circuits clean subtrees: a node whose dirty flag is clear and
//! whose fingerprint (own config + state + size + children) is
//! unchanged reuses last frame's surface.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use braid_term::{Attrs, Style};

use crate::geometry::Rect;
use crate::node::{NodeArena, NodeId, NodeState};
use crate::surface::{RenderCache, Surface};
use crate::widget::{SplitDirection, Widget};

use super::layout::{splitter_panes, table_column_widths, text_width};

/// Render the tree rooted at `root` into a surface of its bounds size.
pub fn render_root(arena: &mut NodeArena, root: NodeId, cache: &mut RenderCache) -> Arc<Surface> {
    render_node(arena, root, cache).0
}

/// Render one node, returning its surface and subtree fingerprint.
pub fn render_node(
    arena: &mut NodeArena,
    id: NodeId,
    cache: &mut RenderCache,
) -> (Arc<Surface>, u64) {
    let Some(node) = arena.get(id) else {
        return (Arc::new(Surface::new(0, 0)), 0);
    };
    let bounds = node.bounds;
    let widget = node.widget.clone();
    let state = node.state.clone();
    let focused = node.focused;
    let dirty = node.dirty;
    let children = node.children.clone();
    let own_fp = node.own_fingerprint();

    // Children first: their fingerprints feed the subtree fingerprint,
    // so any deep change forces this node to recomposite.
    let mut rendered: Vec<(NodeId, Arc<Surface>, u64, Rect)> = Vec::new();
    for &child in &children {
        let child_bounds = arena.get(child).map(|n| n.bounds).unwrap_or(Rect::ZERO);
        if child_bounds.is_empty() {
            continue;
        }
        let (surface, fp) = render_node(arena, child, cache);
        rendered.push((child, surface, fp, child_bounds));
    }

    let mut hasher = DefaultHasher::new();
    own_fp.hash(&mut hasher);
    for (_, _, fp, child_bounds) in &rendered {
        fp.hash(&mut hasher);
        child_bounds.hash(&mut hasher);
    }
    let fp = hasher.finish();

    if !dirty {
        if let Some(cached) = cache.get(id, fp) {
            return (cached, fp);
        }
    }

    let mut surface = Surface::new(bounds.width(), bounds.height());
    draw(&mut surface, &widget, &state, focused, bounds);

    // Composite children at their offsets relative to this node. Scroll
    // regions shift their child up by the scroll offset.
    let scroll_offset = match &state {
        NodeState::Scroll(s) => i32::from(s.offset),
        _ => 0,
    };
    for (_, child_surface, _, child_bounds) in &rendered {
        let dx = i32::from(child_bounds.x()) - i32::from(bounds.x());
        let dy = i32::from(child_bounds.y()) - i32::from(bounds.y()) - scroll_offset;
        surface.composite(child_surface, dx, dy);
    }

    let surface = Arc::new(surface);
    cache.insert(id, fp, Arc::clone(&surface));
    (surface, fp)
}

// Draw a node's own content (not its children).
fn draw(surface: &mut Surface, widget: &Widget, state: &NodeState, focused: bool, bounds: Rect) {
    let w = bounds.width();
    let h = bounds.height();
    if w == 0 || h == 0 {
        return;
    }
    match widget {
        Widget::Text(config) => {
            for (y, line) in config.text.split('\n').enumerate() {
                if y as u16 >= h {
                    break;
                }
                surface.write_text(0, y as u16, line, &config.style);
            }
        }
        Widget::Button(config) => {
            let style = if focused {
                Style::new().attrs(Attrs::REVERSE)
            } else {
                Style::default()
            };
            let label = format!("[ {} ]", config.label);
            surface.write_text(0, 0, &label, &style);
        }
        Widget::Border(config) => {
            draw_border(surface, w, h, config.title.as_deref(), &config.style);
        }
        Widget::List(config) => {
            let (selected, offset) = match state {
                NodeState::List(s) => (s.selected, s.offset),
                _ => (0, 0),
            };
            for (row, item) in config.items.iter().skip(offset).enumerate() {
                if row as u16 >= h {
                    break;
                }
                let index = row + offset;
                let is_selected = index == selected;
                let style = if is_selected && focused {
                    Style::new().attrs(Attrs::REVERSE)
                } else if is_selected {
                    Style::new().attrs(Attrs::BOLD)
                } else {
                    Style::default()
                };
                let marker = if is_selected { "> " } else { "  " };
                surface.write_text(0, row as u16, &format!("{marker}{item}"), &style);
            }
        }
        Widget::Picker(config) => {
            let selected = match state {
                NodeState::Picker(s) => s.selected,
                _ => 0,
            };
            let current = config.options.get(selected).map(String::as_str).unwrap_or("");
            let style = if focused {
                Style::new().attrs(Attrs::REVERSE)
            } else {
                Style::default()
            };
            surface.write_text(0, 0, &format!("\u{25c2} {current} \u{25b8}"), &style);
        }
        Widget::Table(config) => {
            let (selected, offset) = match state {
                NodeState::Table(s) => (s.selected, s.offset),
                _ => (0, 0),
            };
            let widths = table_column_widths(&config.columns, &config.rows);
            let header_style = Style::new().attrs(Attrs::BOLD);
            surface.write_text(0, 0, &pad_row(&config.columns, &widths), &header_style);
            for (row, cells) in config.rows.iter().skip(offset).enumerate() {
                let y = row as u16 + 1;
                if y >= h {
                    break;
                }
                let index = row + offset;
                let style = if index == selected && focused {
                    Style::new().attrs(Attrs::REVERSE)
                } else {
                    Style::default()
                };
                surface.write_text(0, y, &pad_row(cells, &widths), &style);
            }
        }
        Widget::TextBox(config) => {
            let empty = TextBoxDrawState::default();
            let s = match state {
                NodeState::TextBox(s) => TextBoxDrawState {
                    text: &s.text,
                    cursor: s.cursor,
                },
                _ => empty,
            };
            if s.text.is_empty() && !config.placeholder.is_empty() && !focused {
                surface.write_text(0, 0, &config.placeholder, &Style::new().attrs(Attrs::DIM));
            } else {
                surface.write_text(0, 0, s.text, &Style::default());
            }
            if focused {
                // Cursor cell rendered in reverse video.
                let cursor_x = text_width(
                    &s.text.chars().take(s.cursor).collect::<String>(),
                );
                if cursor_x < w {
                    let under: String = s
                        .text
                        .chars()
                        .nth(s.cursor)
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| " ".to_string());
                    surface.write_text(cursor_x, 0, &under, &Style::new().attrs(Attrs::REVERSE));
                }
            }
        }
        Widget::Spinner(config) => {
            let frame = match state {
                NodeState::Spinner(s) => s.frame,
                _ => 0,
            };
            if let Some(glyph) = config.frames.get(frame % config.frames.len().max(1)) {
                surface.write_text(0, 0, glyph, &Style::default());
            }
        }
        Widget::Progress(config) => {
            let fraction = config.fraction.clamp(0.0, 1.0);
            let filled = (f32::from(w) * fraction).round() as u16;
            for x in 0..w {
                let glyph = if x < filled { "\u{2588}" } else { "\u{2591}" };
                surface.write_text(x, 0, glyph, &Style::default());
            }
        }
        Widget::Splitter(config) => {
            let (first, _) = splitter_panes(bounds.size, config.direction, config.ratio);
            match config.direction {
                SplitDirection::Horizontal => {
                    let x = first.width();
                    for y in 0..h {
                        surface.write_text(x, y, "\u{2502}", &Style::default());
                    }
                }
                SplitDirection::Vertical => {
                    let y = first.height();
                    for x in 0..w {
                        surface.write_text(x, y, "\u{2500}", &Style::default());
                    }
                }
            }
        }
        // Pure containers draw nothing of their own.
        Widget::VStack(_)
        | Widget::HStack(_)
        | Widget::ZStack(_)
        | Widget::Scroll(_)
        | Widget::Responsive(_)
        | Widget::Rescue(_) => {}
    }
}

#[derive(Default)]
struct TextBoxDrawState<'a> {
    text: &'a str,
    cursor: usize,
}

fn draw_border(surface: &mut Surface, w: u16, h: u16, title: Option<&str>, style: &Style) {
    if w < 2 || h < 2 {
        return;
    }
    surface.write_text(0, 0, "\u{250c}", style);
    surface.write_text(w - 1, 0, "\u{2510}", style);
    surface.write_text(0, h - 1, "\u{2514}", style);
    surface.write_text(w - 1, h - 1, "\u{2518}", style);
    for x in 1..w - 1 {
        surface.write_text(x, 0, "\u{2500}", style);
        surface.write_text(x, h - 1, "\u{2500}", style);
    }
    for y in 1..h - 1 {
        surface.write_text(0, y, "\u{2502}", style);
        surface.write_text(w - 1, y, "\u{2502}", style);
    }
    if let Some(title) = title {
        let max = w.saturating_sub(4);
        if max > 0 && text_width(title) <= max {
            surface.write_text(2, 0, &format!(" {title} "), style);
        }
    }
}

fn pad_row(cells: &[String], widths: &[u16]) -> String {
    let mut out = String::new();
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        out.push_str(cell);
        let pad = width.saturating_sub(text_width(cell));
        for _ in 0..pad {
            out.push(' ');
        }
    }
    out
}
