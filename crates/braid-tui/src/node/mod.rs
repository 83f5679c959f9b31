//! The persistent node tree.
//!
//! Nodes are the mutable counterparts of widgets: they survive across
//! frames (as long as the widget variant at their slot stays the same)
//! and hold everything a value-typed widget cannot — measured sizes,
//! arranged bounds, focus, and per-variant state like a text box's
//! cursor. The tree is an arena of indices; nodes refer to children by
//! id, never by pointer.

mod layout;
mod reconcile;
mod render;

pub use layout::{arrange, measure};
pub use reconcile::reconcile;
pub use render::{render_node, render_root};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::geometry::{Rect, Size};
use crate::widget::{Widget, WidgetKind};

/// Index of a node in the arena.
pub type NodeId = usize;

/// Per-variant mutable state.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum NodeState {
    /// Variants with no state.
    #[default]
    None,
    /// Text box editing state.
    TextBox(TextBoxState),
    /// List selection state.
    List(ListState),
    /// Picker selection state.
    Picker(PickerState),
    /// Table selection state.
    Table(TableState),
    /// Scroll offset state.
    Scroll(ScrollState),
    /// Spinner animation state.
    Spinner(SpinnerState),
    /// Rescue boundary state.
    Rescue(RescueState),
}

/// Editing state of a text box.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextBoxState {
    /// Current content.
    pub text: String,
    /// Cursor position in characters.
    pub cursor: usize,
    /// Active selection as a character range, if any.
    pub selection: Option<(usize, usize)>,
}

/// Selection state of a list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListState {
    /// Selected item index.
    pub selected: usize,
    /// First visible item.
    pub offset: usize,
}

/// Selection state of a picker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PickerState {
    /// Selected option index.
    pub selected: usize,
}

/// Selection state of a table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableState {
    /// Selected row index.
    pub selected: usize,
    /// First visible row.
    pub offset: usize,
}

/// Scroll offset of a scroll region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrollState {
    /// Rows scrolled off the top.
    pub offset: u16,
}

/// Animation phase of a spinner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpinnerState {
    /// Current frame index.
    pub frame: usize,
}

/// Failure state of a rescue boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RescueState {
    /// Whether the guarded subtree failed.
    pub failed: bool,
    /// The failure message, for diagnostics.
    pub message: Option<String>,
}

impl NodeState {
    /// Initial state for a freshly constructed node.
    pub fn for_widget(widget: &Widget) -> Self {
        match widget {
            Widget::TextBox(config) => NodeState::TextBox(TextBoxState {
                cursor: config.text.chars().count(),
                text: config.text.clone(),
                selection: None,
            }),
            Widget::List(_) => NodeState::List(ListState::default()),
            Widget::Picker(_) => NodeState::Picker(PickerState::default()),
            Widget::Table(_) => NodeState::Table(TableState::default()),
            Widget::Scroll(_) => NodeState::Scroll(ScrollState::default()),
            Widget::Spinner(_) => NodeState::Spinner(SpinnerState::default()),
            Widget::Rescue(_) => NodeState::Rescue(RescueState::default()),
            _ => NodeState::None,
        }
    }
}

/// A persistent node.
#[derive(Clone, Debug)]
pub struct Node {
    /// Current widget-derived configuration.
    pub widget: Widget,
    /// Per-variant state.
    pub state: NodeState,
    /// Child node ids in document order.
    pub children: Vec<NodeId>,
    /// Size from the last measure pass.
    pub measured: Size,
    /// Bounds from the last arrange pass.
    pub bounds: Rect,
    /// Bounds used for mouse hit-testing. Zero whenever `bounds` is
    /// zero-sized, so invisible nodes never take clicks.
    pub hit_bounds: Rect,
    /// Set when internal state mutates; cleared at end of frame.
    pub dirty: bool,
    /// Whether this node currently has focus.
    pub focused: bool,
}

impl Node {
    fn new(widget: Widget) -> Self {
        let state = NodeState::for_widget(&widget);
        Self {
            widget,
            state,
            children: Vec::new(),
            measured: Size::default(),
            bounds: Rect::ZERO,
            hit_bounds: Rect::ZERO,
            dirty: true,
            focused: false,
        }
    }

    /// The node's widget variant.
    pub fn kind(&self) -> WidgetKind {
        self.widget.kind()
    }

    /// Fingerprint of everything that affects this node's own pixels:
    /// visible configuration, state, focus, and arranged size. Children
    /// are hashed separately by the renderer.
    pub fn own_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.kind().hash(&mut hasher);
        self.bounds.size.hash(&mut hasher);
        self.focused.hash(&mut hasher);
        match &self.widget {
            Widget::Text(c) => {
                c.text.hash(&mut hasher);
                hash_style(&c.style, &mut hasher);
            }
            Widget::Button(c) => c.label.hash(&mut hasher),
            Widget::Border(c) => {
                c.title.hash(&mut hasher);
                hash_style(&c.style, &mut hasher);
            }
            Widget::List(c) => c.items.hash(&mut hasher),
            Widget::Picker(c) => c.options.hash(&mut hasher),
            Widget::Table(c) => {
                c.columns.hash(&mut hasher);
                c.rows.hash(&mut hasher);
            }
            Widget::TextBox(c) => c.placeholder.hash(&mut hasher),
            Widget::Spinner(c) => c.frames.hash(&mut hasher),
            Widget::Progress(c) => c.fraction.to_bits().hash(&mut hasher),
            Widget::Splitter(c) => {
                c.ratio.hash(&mut hasher);
                (c.direction as u8).hash(&mut hasher);
            }
            Widget::Responsive(c) => c.breakpoint.hash(&mut hasher),
            _ => {}
        }
        match &self.state {
            NodeState::None => {}
            NodeState::TextBox(s) => {
                s.text.hash(&mut hasher);
                s.cursor.hash(&mut hasher);
                s.selection.hash(&mut hasher);
            }
            NodeState::List(s) => {
                s.selected.hash(&mut hasher);
                s.offset.hash(&mut hasher);
            }
            NodeState::Picker(s) => s.selected.hash(&mut hasher),
            NodeState::Table(s) => {
                s.selected.hash(&mut hasher);
                s.offset.hash(&mut hasher);
            }
            NodeState::Scroll(s) => s.offset.hash(&mut hasher),
            NodeState::Spinner(s) => s.frame.hash(&mut hasher),
            NodeState::Rescue(s) => {
                s.failed.hash(&mut hasher);
                s.message.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

fn hash_style(style: &braid_term::Style, hasher: &mut DefaultHasher) {
    style.fg.hash(hasher);
    style.bg.hash(hasher);
    style.attrs.bits().hash(hasher);
}

/// Arena of nodes, addressed by index.
///
/// Slots are reused, so a bare [`NodeId`] can dangle across frames;
/// holders that outlive a frame (popup anchors) pair the id with its
/// [`NodeArena::generation`] to detect replacement.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,
    generations: Vec<u32>,
    free: Vec<NodeId>,
}

impl NodeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node for a widget. Children are attached by the
    /// reconciler.
    pub fn alloc(&mut self, widget: Widget) -> NodeId {
        let node = Node::new(widget);
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.generations.push(0);
                self.slots.len() - 1
            }
        }
    }

    /// Generation of a slot; bumps every time its node is destroyed.
    pub fn generation(&self, id: NodeId) -> u32 {
        self.generations.get(id).copied().unwrap_or(0)
    }

    /// Borrow a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    /// Borrow a node mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    /// Whether the id refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns true if no nodes are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy a node and all descendants. Returns the removed ids.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut removed = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.slots.get_mut(id).and_then(Option::take) {
                stack.extend(node.children.iter().copied());
                if let Some(generation) = self.generations.get_mut(id) {
                    *generation += 1;
                }
                removed.push(id);
                self.free.push(id);
            }
        }
        removed
    }

    /// Document-order (pre-order) walk from a root.
    pub fn doc_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.doc_order_into(root, &mut out);
        out
    }

    fn doc_order_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if let Some(node) = self.get(id) {
            out.push(id);
            for child in node.children.clone() {
                self.doc_order_into(child, out);
            }
        }
    }

    /// Clear every dirty flag (end of frame).
    pub fn clear_dirty(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Widget;

    #[test]
    fn alloc_and_get() {
        let mut arena = NodeArena::new();
        let id = arena.alloc(Widget::text("hi"));
        assert!(arena.contains(id));
        assert_eq!(arena.get(id).map(Node::kind), Some(WidgetKind::Text));
    }

    #[test]
    fn remove_subtree_frees_children() {
        let mut arena = NodeArena::new();
        let child = arena.alloc(Widget::text("c"));
        let parent = arena.alloc(Widget::vstack(vec![]));
        if let Some(p) = arena.get_mut(parent) {
            p.children.push(child);
        }
        let removed = arena.remove_subtree(parent);
        assert_eq!(removed.len(), 2);
        assert!(!arena.contains(parent));
        assert!(!arena.contains(child));
        assert!(arena.is_empty());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(Widget::text("a"));
        arena.remove_subtree(a);
        let b = arena.alloc(Widget::text("b"));
        assert_eq!(a, b);
    }

    #[test]
    fn generation_distinguishes_reused_slots() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(Widget::text("a"));
        let gen_a = arena.generation(a);
        arena.remove_subtree(a);
        let b = arena.alloc(Widget::text("b"));
        assert_eq!(a, b);
        assert_ne!(gen_a, arena.generation(b));
    }

    #[test]
    fn text_box_state_seeded_from_config() {
        let state = NodeState::for_widget(&Widget::text_box("hello"));
        match state {
            NodeState::TextBox(s) => {
                assert_eq!(s.text, "hello");
                assert_eq!(s.cursor, 5);
            }
            other => panic!("wrong state: {other:?}"),
        }
    }

    #[test]
    fn fingerprint_changes_with_state() {
        let mut arena = NodeArena::new();
        let id = arena.alloc(Widget::text_box("a"));
        let fp1 = arena.get(id).map(Node::own_fingerprint);
        if let Some(node) = arena.get_mut(id) {
            if let NodeState::TextBox(s) = &mut node.state {
                s.text.push('b');
                s.cursor += 1;
            }
        }
        let fp2 = arena.get(id).map(Node::own_fingerprint);
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn fingerprint_changes_with_focus() {
        let mut arena = NodeArena::new();
        let id = arena.alloc(Widget::button("ok", crate::widget::Handler::none()));
        let fp1 = arena.get(id).map(Node::own_fingerprint);
        if let Some(node) = arena.get_mut(id) {
            node.focused = true;
        }
        let fp2 = arena.get(id).map(Node::own_fingerprint);
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn doc_order_is_preorder() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(Widget::text("a"));
        let b = arena.alloc(Widget::text("b"));
        let root = arena.alloc(Widget::vstack(vec![]));
        if let Some(r) = arena.get_mut(root) {
            r.children = vec![a, b];
        }
        assert_eq!(arena.doc_order(root), vec![root, a, b]);
    }
}
