//! Widget-tree to node-tree reconciliation.

use crate::widget::Widget;

use super::{NodeArena, NodeId};

/// Reconcile one tree slot against a fresh widget.
///
/// A node persists iff the widget at the same slot has the same
/// variant; on mismatch the node (and its whole subtree) is destroyed
/// before a new one is constructed. Matching nodes take a shallow copy
/// of the new widget's configuration and recurse into children aligned
/// by position. Destroyed node ids accumulate in `removed` so the
/// caller can drop cached surfaces.
///
/// Reconcile does no layout work and runs in O(nodes).
pub fn reconcile(
    arena: &mut NodeArena,
    existing: Option<NodeId>,
    widget: &Widget,
    removed: &mut Vec<NodeId>,
) -> NodeId {
    let id = match existing {
        Some(id) if arena.get(id).is_some_and(|n| n.kind() == widget.kind()) => {
            if let Some(node) = arena.get_mut(id) {
                node.widget = widget.clone();
            }
            id
        }
        Some(id) => {
            removed.extend(arena.remove_subtree(id));
            arena.alloc(widget.clone())
        }
        None => arena.alloc(widget.clone()),
    };

    let existing_children: Vec<NodeId> = arena.get(id).map(|n| n.children.clone()).unwrap_or_default();
    let widget_children = widget.children();

    let mut new_children = Vec::with_capacity(widget_children.len());
    for (i, child_widget) in widget_children.iter().enumerate() {
        let slot = existing_children.get(i).copied();
        new_children.push(reconcile(arena, slot, child_widget, removed));
    }
    // Extra existing children have no widget slot this frame.
    for &extra in existing_children.iter().skip(widget_children.len()) {
        removed.extend(arena.remove_subtree(extra));
    }

    if let Some(node) = arena.get_mut(id) {
        node.children = new_children;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeState;
    use crate::widget::{Handler, Widget};

    fn reconcile_fresh(arena: &mut NodeArena, widget: &Widget) -> NodeId {
        let mut removed = Vec::new();
        reconcile(arena, None, widget, &mut removed)
    }

    #[test]
    fn builds_tree_on_first_frame() {
        let mut arena = NodeArena::new();
        let tree = Widget::vstack(vec![Widget::text("a"), Widget::button("b", Handler::none())]);
        let root = reconcile_fresh(&mut arena, &tree);
        let children = arena.get(root).map(|n| n.children.clone()).unwrap_or_default();
        assert_eq!(children.len(), 2);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn same_variant_preserves_node_and_state() {
        let mut arena = NodeArena::new();
        let frame1 = Widget::vstack(vec![Widget::text_box("hello")]);
        let root = reconcile_fresh(&mut arena, &frame1);
        let box_id = arena.get(root).and_then(|n| n.children.first().copied());

        // The user typed a character between frames.
        if let Some(id) = box_id {
            if let Some(node) = arena.get_mut(id) {
                if let NodeState::TextBox(s) = &mut node.state {
                    s.text.push('!');
                    s.cursor += 1;
                }
                node.dirty = true;
            }
        }

        // An identical widget tree arrives next frame.
        let frame2 = Widget::vstack(vec![Widget::text_box("hello")]);
        let mut removed = Vec::new();
        let root2 = reconcile(&mut arena, Some(root), &frame2, &mut removed);
        assert_eq!(root, root2);
        assert!(removed.is_empty());

        let box_id2 = arena.get(root2).and_then(|n| n.children.first().copied());
        assert_eq!(box_id, box_id2);
        match box_id2.and_then(|id| arena.get(id)).map(|n| &n.state) {
            Some(NodeState::TextBox(s)) => {
                assert_eq!(s.text, "hello!");
                assert_eq!(s.cursor, 6);
            }
            other => panic!("state lost: {other:?}"),
        }
    }

    #[test]
    fn variant_change_destroys_node() {
        let mut arena = NodeArena::new();
        let root = reconcile_fresh(&mut arena, &Widget::vstack(vec![Widget::text("x")]));
        let old_child = arena.get(root).and_then(|n| n.children.first().copied());

        let mut removed = Vec::new();
        let root2 = reconcile(
            &mut arena,
            Some(root),
            &Widget::vstack(vec![Widget::button("x", Handler::none())]),
            &mut removed,
        );
        assert_eq!(root, root2);
        assert_eq!(removed, old_child.map(|id| vec![id]).unwrap_or_default());
        let new_child = arena.get(root2).and_then(|n| n.children.first().copied());
        assert!(new_child.is_some());
        // The freed slot may be reused, but the node is freshly built.
        if let Some(id) = new_child {
            assert_eq!(
                arena.get(id).map(|n| n.kind()),
                Some(crate::widget::WidgetKind::Button)
            );
        }
    }

    #[test]
    fn extra_children_are_destroyed() {
        let mut arena = NodeArena::new();
        let root = reconcile_fresh(
            &mut arena,
            &Widget::vstack(vec![Widget::text("a"), Widget::text("b"), Widget::text("c")]),
        );
        let mut removed = Vec::new();
        reconcile(
            &mut arena,
            Some(root),
            &Widget::vstack(vec![Widget::text("a")]),
            &mut removed,
        );
        assert_eq!(removed.len(), 2);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn extra_widgets_create_nodes() {
        let mut arena = NodeArena::new();
        let root = reconcile_fresh(&mut arena, &Widget::vstack(vec![Widget::text("a")]));
        let mut removed = Vec::new();
        reconcile(
            &mut arena,
            Some(root),
            &Widget::vstack(vec![Widget::text("a"), Widget::text("b")]),
            &mut removed,
        );
        assert!(removed.is_empty());
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn config_updates_in_place() {
        let mut arena = NodeArena::new();
        let root = reconcile_fresh(&mut arena, &Widget::text("old"));
        let mut removed = Vec::new();
        let root2 = reconcile(&mut arena, Some(root), &Widget::text("new"), &mut removed);
        assert_eq!(root, root2);
        match arena.get(root2).map(|n| &n.widget) {
            Some(Widget::Text(c)) => assert_eq!(c.text, "new"),
            other => panic!("unexpected widget: {other:?}"),
        }
    }
}
