//! Measure and arrange passes over the node tree.
//!
//! Measure asks each node for its preferred size within constraints;
//! arrange assigns final rectangles. Both walk the tree top-down and
//! dispatch on the widget variant. Scrolled subtrees keep *virtual*
//! bounds (as if unscrolled); hit-test bounds are the on-screen
//! visible portion, computed from the accumulated scroll offset.

use braid_term::display_width;
use unicode_segmentation::UnicodeSegmentation;

use crate::geometry::{Rect, Size};
use crate::layout::{Constraints, SizeHint, UNBOUNDED, distribute};
use crate::node::{NodeArena, NodeId, NodeState};
use crate::widget::{SplitDirection, Widget};

/// Display width of a string in cells.
pub(crate) fn text_width(s: &str) -> u16 {
    s.graphemes(true).map(|g| u16::from(display_width(g))).sum()
}

fn measure_children_sizes(arena: &NodeArena, children: &[NodeId]) -> Vec<Size> {
    children
        .iter()
        .map(|&c| arena.get(c).map(|n| n.measured).unwrap_or_default())
        .collect()
}

/// Measure a node within constraints; records and returns its size.
pub fn measure(arena: &mut NodeArena, id: NodeId, c: Constraints) -> Size {
    let Some(node) = arena.get(id) else {
        return Size::default();
    };
    let widget = node.widget.clone();
    let children = node.children.clone();
    let state = node.state.clone();

    let size = match &widget {
        Widget::Text(config) => {
            let mut width = 0u16;
            let mut lines = 0u16;
            for line in config.text.split('\n') {
                width = width.max(text_width(line));
                lines += 1;
            }
            c.clamp(Size::new(width, lines))
        }
        Widget::Button(config) => c.clamp(Size::new(text_width(&config.label) + 4, 1)),
        Widget::Spinner(_) => c.clamp(Size::new(1, 1)),
        Widget::Progress(_) => {
            let width = if c.max_width == UNBOUNDED { 10 } else { c.max_width };
            c.clamp(Size::new(width, 1))
        }
        Widget::TextBox(config) => {
            let content = text_width(&config.placeholder).max(10) + 1;
            let width = if c.max_width == UNBOUNDED { content } else { c.max_width };
            c.clamp(Size::new(width, 1))
        }
        Widget::Picker(config) => {
            let widest = config.options.iter().map(|o| text_width(o)).max().unwrap_or(0);
            c.clamp(Size::new(widest + 4, 1))
        }
        Widget::List(config) => {
            let widest = config.items.iter().map(|i| text_width(i)).max().unwrap_or(0);
            c.clamp(Size::new(widest + 2, config.items.len() as u16))
        }
        Widget::Table(config) => {
            let widths = table_column_widths(&config.columns, &config.rows);
            let total: u16 = widths.iter().sum::<u16>()
                + 2 * widths.len().saturating_sub(1) as u16;
            c.clamp(Size::new(total, config.rows.len() as u16 + 1))
        }
        Widget::VStack(_) => {
            let mut width = 0u16;
            let mut height = 0u16;
            for &child in &children {
                let remaining = if c.max_height == UNBOUNDED {
                    UNBOUNDED
                } else {
                    c.max_height.saturating_sub(height)
                };
                let size = measure(arena, child, c.loosened().with_max_height(remaining));
                width = width.max(size.width);
                height = height.saturating_add(size.height);
            }
            c.clamp(Size::new(width, height))
        }
        Widget::HStack(_) => {
            let mut width = 0u16;
            let mut height = 0u16;
            for &child in &children {
                let remaining = if c.max_width == UNBOUNDED {
                    UNBOUNDED
                } else {
                    c.max_width.saturating_sub(width)
                };
                let size = measure(arena, child, c.loosened().with_max_width(remaining));
                width = width.saturating_add(size.width);
                height = height.max(size.height);
            }
            c.clamp(Size::new(width, height))
        }
        Widget::ZStack(_) => {
            let mut width = 0u16;
            let mut height = 0u16;
            for &child in &children {
                let size = measure(arena, child, c.loosened());
                width = width.max(size.width);
                height = height.max(size.height);
            }
            c.clamp(Size::new(width, height))
        }
        Widget::Border(_) => {
            let inner = children
                .first()
                .map(|&child| measure(arena, child, c.deflate(2, 2)))
                .unwrap_or_default();
            c.clamp(Size::new(
                inner.width.saturating_add(2),
                inner.height.saturating_add(2),
            ))
        }
        Widget::Scroll(_) => {
            let inner = children
                .first()
                .map(|&child| {
                    let unbounded = Constraints {
                        max_height: UNBOUNDED,
                        min_height: 0,
                        ..c.loosened()
                    };
                    measure(arena, child, unbounded)
                })
                .unwrap_or_default();
            c.clamp(Size::new(inner.width, inner.height))
        }
        Widget::Splitter(config) => {
            let size = c.biggest();
            let (first, second) = splitter_panes(size, config.direction, config.ratio);
            if let Some(&child) = children.first() {
                measure(arena, child, Constraints::tight(first.size));
            }
            if let Some(&child) = children.get(1) {
                measure(arena, child, Constraints::tight(second.size));
            }
            size
        }
        Widget::Responsive(config) => {
            let wide = c.max_width != UNBOUNDED && c.max_width >= config.breakpoint;
            let chosen = if wide { children.get(1) } else { children.first() };
            let other = if wide { children.first() } else { children.get(1) };
            if let Some(&skip) = other {
                measure(arena, skip, Constraints::tight(Size::default()));
            }
            chosen
                .map(|&child| measure(arena, child, c))
                .unwrap_or_default()
        }
        Widget::Rescue(_) => {
            let failed = matches!(&state, NodeState::Rescue(s) if s.failed);
            let chosen = if failed { children.get(1) } else { children.first() };
            let other = if failed { children.first() } else { children.get(1) };
            if let Some(&skip) = other {
                measure(arena, skip, Constraints::tight(Size::default()));
            }
            chosen
                .map(|&child| measure(arena, child, c))
                .unwrap_or_default()
        }
    };

    if let Some(node) = arena.get_mut(id) {
        node.measured = size;
    }
    size
}

/// Arrange a node into its final rectangle.
///
/// `clip` is the visible screen region; `scroll_dy` is the total rows
/// this subtree is shifted up by enclosing scroll regions.
pub fn arrange(arena: &mut NodeArena, id: NodeId, rect: Rect, clip: Rect, scroll_dy: u16) {
    let Some(node) = arena.get_mut(id) else { return };
    node.bounds = rect;
    node.hit_bounds = if rect.is_empty() {
        Rect::ZERO
    } else {
        shift_up(rect, scroll_dy)
            .and_then(|visible| visible.intersection(&clip))
            .unwrap_or(Rect::ZERO)
    };

    let widget = node.widget.clone();
    let children = node.children.clone();
    let state = node.state.clone();

    match &widget {
        Widget::VStack(_) => {
            let sizes = measure_children_sizes(arena, &children);
            let items: Vec<(SizeHint, u16)> = children
                .iter()
                .zip(&sizes)
                .map(|(&c, size)| {
                    let hint = arena.get(c).map(|n| n.widget.hints().height).unwrap_or_default();
                    (hint, size.height)
                })
                .collect();
            let heights = distribute(rect.height(), &items);
            let mut y = rect.y();
            for ((&child, size), height) in children.iter().zip(&sizes).zip(heights) {
                let hint = arena.get(child).map(|n| n.widget.hints().width).unwrap_or_default();
                let width = match hint {
                    SizeHint::Fixed(n) => n.min(rect.width()),
                    SizeHint::Fill(_) => rect.width(),
                    SizeHint::Hug => size.width.min(rect.width()),
                };
                arrange(
                    arena,
                    child,
                    Rect::new(rect.x(), y, width, height),
                    clip,
                    scroll_dy,
                );
                y = y.saturating_add(height);
            }
        }
        Widget::HStack(_) => {
            let sizes = measure_children_sizes(arena, &children);
            let items: Vec<(SizeHint, u16)> = children
                .iter()
                .zip(&sizes)
                .map(|(&c, size)| {
                    let hint = arena.get(c).map(|n| n.widget.hints().width).unwrap_or_default();
                    (hint, size.width)
                })
                .collect();
            let widths = distribute(rect.width(), &items);
            let mut x = rect.x();
            for ((&child, size), width) in children.iter().zip(&sizes).zip(widths) {
                let hint = arena.get(child).map(|n| n.widget.hints().height).unwrap_or_default();
                let height = match hint {
                    SizeHint::Fixed(n) => n.min(rect.height()),
                    SizeHint::Fill(_) => rect.height(),
                    SizeHint::Hug => size.height.min(rect.height()),
                };
                arrange(
                    arena,
                    child,
                    Rect::new(x, rect.y(), width, height),
                    clip,
                    scroll_dy,
                );
                x = x.saturating_add(width);
            }
        }
        Widget::ZStack(_) => {
            // Layers anchor at the stack's origin; hug-content layers
            // keep their measured size so lower layers show around them.
            for &child in &children {
                let (hints, measured) = arena
                    .get(child)
                    .map(|n| (n.widget.hints(), n.measured))
                    .unwrap_or_default();
                let width = match hints.width {
                    SizeHint::Fixed(n) => n.min(rect.width()),
                    SizeHint::Fill(_) => rect.width(),
                    SizeHint::Hug => measured.width.min(rect.width()),
                };
                let height = match hints.height {
                    SizeHint::Fixed(n) => n.min(rect.height()),
                    SizeHint::Fill(_) => rect.height(),
                    SizeHint::Hug => measured.height.min(rect.height()),
                };
                arrange(
                    arena,
                    child,
                    Rect::new(rect.x(), rect.y(), width, height),
                    clip,
                    scroll_dy,
                );
            }
        }
        Widget::Border(_) => {
            if let Some(&child) = children.first() {
                arrange(arena, child, rect.inset(1), clip, scroll_dy);
            }
        }
        Widget::Scroll(_) => {
            if let Some(&child) = children.first() {
                let child_height = arena
                    .get(child)
                    .map(|n| n.measured.height)
                    .unwrap_or_default();
                let max_offset = child_height.saturating_sub(rect.height());
                let offset = match &state {
                    NodeState::Scroll(s) => s.offset.min(max_offset),
                    _ => 0,
                };
                if let Some(node) = arena.get_mut(id) {
                    node.state = NodeState::Scroll(super::ScrollState { offset });
                }
                let viewport = shift_up(rect, scroll_dy)
                    .and_then(|v| v.intersection(&clip))
                    .unwrap_or(Rect::ZERO);
                arrange(
                    arena,
                    child,
                    Rect::new(rect.x(), rect.y(), rect.width(), child_height),
                    viewport,
                    scroll_dy.saturating_add(offset),
                );
            }
        }
        Widget::Splitter(config) => {
            let (first, second) = splitter_panes(rect.size, config.direction, config.ratio);
            let offset = |r: Rect| Rect::new(rect.x() + r.x(), rect.y() + r.y(), r.width(), r.height());
            if let Some(&child) = children.first() {
                arrange(arena, child, offset(first), clip, scroll_dy);
            }
            if let Some(&child) = children.get(1) {
                arrange(arena, child, offset(second), clip, scroll_dy);
            }
        }
        Widget::Responsive(config) => {
            let wide = rect.width() >= config.breakpoint;
            let (chosen, other) = if wide {
                (children.get(1), children.first())
            } else {
                (children.first(), children.get(1))
            };
            if let Some(&skip) = other {
                arrange(arena, skip, Rect::ZERO, clip, scroll_dy);
            }
            if let Some(&child) = chosen {
                arrange(arena, child, rect, clip, scroll_dy);
            }
        }
        Widget::Rescue(_) => {
            let failed = matches!(&state, NodeState::Rescue(s) if s.failed);
            let (chosen, other) = if failed {
                (children.get(1), children.first())
            } else {
                (children.first(), children.get(1))
            };
            if let Some(&skip) = other {
                arrange(arena, skip, Rect::ZERO, clip, scroll_dy);
            }
            if let Some(&child) = chosen {
                arrange(arena, child, rect, clip, scroll_dy);
            }
        }
        // Leaves.
        _ => {}
    }
}

/// Shift a virtual rect up by a scroll offset, dropping the part that
/// scrolled past the top. `None` when fully scrolled out.
fn shift_up(rect: Rect, dy: u16) -> Option<Rect> {
    if dy == 0 {
        return Some(rect);
    }
    let top = i32::from(rect.y()) - i32::from(dy);
    let bottom = top + i32::from(rect.height());
    if bottom <= 0 {
        return None;
    }
    let y = top.max(0) as u16;
    Some(Rect::new(
        rect.x(),
        y,
        rect.width(),
        (bottom - i32::from(y)) as u16,
    ))
}

/// Column widths for a table: each column as wide as its widest cell or
/// header.
pub(crate) fn table_column_widths(columns: &[String], rows: &[Vec<String>]) -> Vec<u16> {
    let mut widths: Vec<u16> = columns.iter().map(|c| text_width(c)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(text_width(cell));
            } else {
                widths.push(text_width(cell));
            }
        }
    }
    widths
}

/// The two pane rects of a splitter, in the splitter's local space.
pub(crate) fn splitter_panes(size: Size, direction: SplitDirection, ratio: u16) -> (Rect, Rect) {
    let ratio = ratio.min(100);
    match direction {
        SplitDirection::Horizontal => {
            let first_w = (u32::from(size.width) * u32::from(ratio) / 100) as u16;
            let first_w = first_w.min(size.width.saturating_sub(1));
            let second_x = first_w.saturating_add(1);
            (
                Rect::new(0, 0, first_w, size.height),
                Rect::new(second_x, 0, size.width.saturating_sub(second_x), size.height),
            )
        }
        SplitDirection::Vertical => {
            let first_h = (u32::from(size.height) * u32::from(ratio) / 100) as u16;
            let first_h = first_h.min(size.height.saturating_sub(1));
            let second_y = first_h.saturating_add(1);
            (
                Rect::new(0, 0, size.width, first_h),
                Rect::new(0, second_y, size.width, size.height.saturating_sub(second_y)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::reconcile;
    use crate::widget::{Handler, Widget};

    fn build(widget: &Widget) -> (NodeArena, NodeId) {
        let mut arena = NodeArena::new();
        let mut removed = Vec::new();
        let root = reconcile(&mut arena, None, widget, &mut removed);
        (arena, root)
    }

    fn layout(widget: &Widget, w: u16, h: u16) -> (NodeArena, NodeId) {
        let (mut arena, root) = build(widget);
        let screen = Rect::new(0, 0, w, h);
        measure(&mut arena, root, Constraints::tight(Size::new(w, h)));
        arrange(&mut arena, root, screen, screen, 0);
        (arena, root)
    }

    #[test]
    fn text_measures_content() {
        let (mut arena, root) = build(&Widget::text("ab\ncdef"));
        let size = measure(
            &mut arena,
            root,
            Constraints::loose(Size::new(40, 10)),
        );
        assert_eq!(size, Size::new(4, 2));
    }

    #[test]
    fn wide_text_measures_double() {
        let (mut arena, root) = build(&Widget::text("\u{4f60}\u{597d}"));
        let size = measure(&mut arena, root, Constraints::loose(Size::new(40, 10)));
        assert_eq!(size, Size::new(4, 1));
    }

    #[test]
    fn vstack_children_get_rows() {
        let tree = Widget::vstack(vec![Widget::text("one"), Widget::text("two")]);
        let (arena, root) = layout(&tree, 10, 4);
        let children = arena.get(root).map(|n| n.children.clone()).unwrap_or_default();
        let a = arena.get(children[0]).map(|n| n.bounds);
        let b = arena.get(children[1]).map(|n| n.bounds);
        assert_eq!(a, Some(Rect::new(0, 0, 3, 1)));
        assert_eq!(b, Some(Rect::new(0, 1, 3, 1)));
    }

    #[test]
    fn fill_hint_takes_leftover() {
        let tree = Widget::vstack(vec![
            Widget::text("top"),
            Widget::text("mid").with_hints(crate::layout::LayoutHints::fill()),
            Widget::text("bot"),
        ]);
        let (arena, root) = layout(&tree, 10, 6);
        let children = arena.get(root).map(|n| n.children.clone()).unwrap_or_default();
        let mid = arena.get(children[1]).map(|n| n.bounds);
        assert_eq!(mid, Some(Rect::new(0, 1, 10, 4)));
    }

    #[test]
    fn border_insets_child() {
        let tree = Widget::border(Widget::text("x"));
        let (arena, root) = layout(&tree, 8, 4);
        let child = arena
            .get(root)
            .and_then(|n| n.children.first().copied())
            .and_then(|id| arena.get(id))
            .map(|n| n.bounds);
        assert_eq!(child, Some(Rect::new(1, 1, 6, 2)));
    }

    #[test]
    fn zero_bounds_zero_hit_bounds() {
        let tree = Widget::vstack(vec![Widget::text("")]);
        let (mut arena, root) = build(&tree);
        measure(&mut arena, root, Constraints::tight(Size::new(10, 2)));
        arrange(&mut arena, root, Rect::new(0, 0, 10, 2), Rect::new(0, 0, 10, 2), 0);
        let child = arena
            .get(root)
            .and_then(|n| n.children.first().copied())
            .and_then(|id| arena.get(id));
        // Empty text still measures one line but zero width.
        assert_eq!(child.map(|n| n.hit_bounds), Some(Rect::ZERO));
    }

    #[test]
    fn responsive_picks_by_width() {
        let tree = Widget::Responsive(crate::widget::ResponsiveConfig {
            breakpoint: 40,
            narrow: Box::new(Widget::text("narrow")),
            wide: Box::new(Widget::text("wide")),
            hints: Default::default(),
        });
        let (arena, root) = layout(&tree, 20, 4);
        let children = arena.get(root).map(|n| n.children.clone()).unwrap_or_default();
        let narrow = arena.get(children[0]).map(|n| n.bounds);
        let wide = arena.get(children[1]).map(|n| n.bounds);
        assert!(narrow.is_some_and(|r| !r.is_empty()));
        assert_eq!(wide, Some(Rect::ZERO));

        let (arena, root) = layout(&tree, 60, 4);
        let children = arena.get(root).map(|n| n.children.clone()).unwrap_or_default();
        assert_eq!(arena.get(children[0]).map(|n| n.bounds), Some(Rect::ZERO));
        assert!(arena.get(children[1]).is_some_and(|n| !n.bounds.is_empty()));
    }

    #[test]
    fn scroll_clamps_offset_and_clips_hits() {
        let items: Vec<Widget> = (0..10).map(|i| Widget::text(format!("item {i}"))).collect();
        let tree = Widget::scroll(Widget::vstack(items));
        let (mut arena, root) = build(&tree);
        // Scroll down by 3 rows before layout.
        if let Some(node) = arena.get_mut(root) {
            node.state = crate::node::NodeState::Scroll(crate::node::ScrollState { offset: 3 });
        }
        let screen = Rect::new(0, 0, 10, 4);
        measure(&mut arena, root, Constraints::tight(Size::new(10, 4)));
        arrange(&mut arena, root, screen, screen, 0);

        let stack = arena.get(root).and_then(|n| n.children.first().copied());
        let rows = stack
            .and_then(|id| arena.get(id))
            .map(|n| n.children.clone())
            .unwrap_or_default();
        // Row 3 is the first visible one; its hit bounds sit at the top.
        let visible = arena.get(rows[3]).map(|n| n.hit_bounds);
        assert_eq!(visible, Some(Rect::new(0, 0, 6, 1)));
        // Row 0 scrolled off: no hit bounds.
        assert_eq!(arena.get(rows[0]).map(|n| n.hit_bounds), Some(Rect::ZERO));
        // Row 8 is below the viewport.
        assert_eq!(arena.get(rows[8]).map(|n| n.hit_bounds), Some(Rect::ZERO));
    }

    #[test]
    fn splitter_panes_split_by_ratio() {
        let (first, second) = splitter_panes(Size::new(21, 5), SplitDirection::Horizontal, 50);
        assert_eq!(first, Rect::new(0, 0, 10, 5));
        assert_eq!(second, Rect::new(11, 0, 10, 5));
    }

    #[test]
    fn table_widths_cover_cells() {
        let widths = table_column_widths(
            &["id".into(), "name".into()],
            &[vec!["1".into(), "alice".into()], vec!["1000".into(), "b".into()]],
        );
        assert_eq!(widths, vec![4, 5]);
    }
}
