//! The focus ring.
//!
//! Rebuilt after every reconcile by walking the node tree in document
//! order and collecting focusable nodes. Tab cycles forward, Shift-Tab
//! backward; entries with zero bounds are skipped so invisible widgets
//! never take focus.

use crate::node::{NodeArena, NodeId};

/// Ordered focusable nodes plus the current focus index.
#[derive(Clone, Debug, Default)]
pub struct FocusRing {
    order: Vec<NodeId>,
    current: Option<usize>,
}

impl FocusRing {
    /// An empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the tree, preserving focus identity when the
    /// previously focused node still exists. With no previous focus the
    /// first focusable node takes it.
    pub fn rebuild(&mut self, arena: &mut NodeArena, root: NodeId) {
        self.rebuild_roots(arena, &[root]);
    }

    /// Rebuild from several roots in order (the base tree followed by
    /// popup subtrees).
    pub fn rebuild_roots(&mut self, arena: &mut NodeArena, roots: &[NodeId]) {
        let previous = self.focused();
        self.order = roots
            .iter()
            .flat_map(|&root| arena.doc_order(root))
            .filter(|&id| arena.get(id).is_some_and(|n| n.widget.is_focusable()))
            .collect();
        self.current = previous
            .and_then(|prev| self.order.iter().position(|&id| id == prev))
            .or(if self.order.is_empty() { None } else { Some(0) });
        self.sync_flags(arena);
    }

    /// All ring entries in document order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// The focused node, if any.
    pub fn focused(&self) -> Option<NodeId> {
        self.current.and_then(|i| self.order.get(i).copied())
    }

    /// Move focus to the next visible entry (Tab).
    pub fn focus_next(&mut self, arena: &mut NodeArena) {
        self.advance(arena, 1);
    }

    /// Move focus to the previous visible entry (Shift-Tab).
    pub fn focus_previous(&mut self, arena: &mut NodeArena) {
        self.advance(arena, -1);
    }

    /// Focus a specific node (click-to-focus). No-op if it is not in
    /// the ring.
    pub fn set_focus(&mut self, arena: &mut NodeArena, id: NodeId) {
        if let Some(pos) = self.order.iter().position(|&n| n == id) {
            self.current = Some(pos);
            self.sync_flags(arena);
        }
    }

    fn advance(&mut self, arena: &mut NodeArena, step: isize) {
        let len = self.order.len();
        if len == 0 {
            return;
        }
        let start = self.current.unwrap_or(0) as isize;
        // Walk at most one full cycle looking for a visible entry.
        for i in 1..=len as isize {
            let idx = (start + step * i).rem_euclid(len as isize) as usize;
            let visible = self
                .order
                .get(idx)
                .and_then(|&id| arena.get(id))
                .is_some_and(|n| !n.hit_bounds.is_empty());
            if visible {
                self.current = Some(idx);
                self.sync_flags(arena);
                return;
            }
        }
    }

    fn sync_flags(&self, arena: &mut NodeArena) {
        let focused = self.focused();
        for &id in &self.order {
            if let Some(node) = arena.get_mut(id) {
                let now = Some(id) == focused;
                if node.focused != now {
                    node.focused = now;
                    node.dirty = true;
                }
            }
        }
    }
}
