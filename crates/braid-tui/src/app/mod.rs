//! The application runtime: a single-threaded cooperative render loop.
//!
//! Per frame: drain events, dispatch input, rebuild widgets, reconcile,
//! measure, arrange, render onto surfaces, diff against the previous
//! frame, and hand the encoded bytes to the adapter. The loop awaits on
//! exactly three things — the input channel, the invalidation signal,
//! and the shutdown token — and nothing else.

use std::sync::Arc;

use tokio::sync::{Notify, watch};
use tracing::{debug, warn};

use crate::adapter::Adapter;
use crate::error::{BraidError, Result};
use crate::event::{Event, KeyCode, KeyEvent, Modifiers, MouseEvent, MouseEventKind};
use crate::geometry::{Position, Rect, Size};
use crate::input::{
    Binding, ChordMatcher, ChordResult, FocusRing, handle_click, handle_key, handle_paste,
    handle_wheel, hit_test, scroll_target,
};
use crate::layout::Constraints;
use crate::node::{
    NodeArena, NodeId, NodeState, RescueState, arrange, measure, reconcile, render_root,
};
use crate::surface::{AnsiEncoder, Comparer, CompositeSurface, RenderCache, Surface};
use crate::time::{Clock, SystemClock};
use crate::widget::Widget;

/// Builds the widget tree for one frame.
pub type BuildFn = Box<dyn FnMut() -> Result<Widget> + Send>;

/// Thread-safe, lock-free invalidation signal. Any thread may request
/// a re-render; the loop wakes via its event source.
#[derive(Clone)]
pub struct InvalidateHandle {
    notify: Arc<Notify>,
}

impl InvalidateHandle {
    /// Request a re-render.
    pub fn invalidate(&self) {
        self.notify.notify_one();
    }
}

/// Cloneable handle that asks the loop to shut down.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Request shutdown. The loop finishes its frame, restores the
    /// terminal, and returns.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

struct Popup {
    anchor: NodeId,
    // Slots are reused, so the generation is what actually detects a
    // replaced anchor.
    anchor_generation: u32,
    widget: Widget,
    root: Option<NodeId>,
    modal: bool,
}

/// The application runtime.
pub struct App {
    adapter: Box<dyn Adapter>,
    events: tokio::sync::mpsc::Receiver<Event>,
    builder: BuildFn,

    arena: NodeArena,
    root: Option<NodeId>,
    ring: FocusRing,
    matcher: ChordMatcher,
    cache: RenderCache,
    comparer: Comparer,
    encoder: AnsiEncoder,
    prev: Surface,
    popups: Vec<Popup>,
    size: Size,

    invalidate: Arc<Notify>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    needs_frame: bool,
    rescue_error: Option<String>,
}

impl App {
    /// Create an app over an adapter with default bindings and the
    /// system clock.
    pub fn new(adapter: Box<dyn Adapter>, builder: BuildFn) -> Result<Self> {
        Self::with_bindings(adapter, builder, Vec::new(), Arc::new(SystemClock::new()))
    }

    /// Create an app with chord bindings and an injected clock.
    pub fn with_bindings(
        mut adapter: Box<dyn Adapter>,
        builder: BuildFn,
        bindings: Vec<Binding>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let events = adapter
            .take_events()
            .ok_or_else(|| BraidError::InvalidInput("adapter events already taken".into()))?;
        let size = adapter.size();
        if size.is_empty() {
            return Err(BraidError::InvalidInput("terminal reports zero size".into()));
        }
        let color = adapter.capabilities().color;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            adapter,
            events,
            builder,
            arena: NodeArena::new(),
            root: None,
            ring: FocusRing::new(),
            matcher: ChordMatcher::new(&bindings, clock),
            cache: RenderCache::new(256),
            comparer: Comparer::new(),
            encoder: AnsiEncoder::new(color),
            prev: Surface::new(size.width, size.height),
            popups: Vec::new(),
            size,
            invalidate: Arc::new(Notify::new()),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            needs_frame: true,
            rescue_error: None,
        })
    }

    /// Handle for cross-thread invalidation.
    pub fn invalidate_handle(&self) -> InvalidateHandle {
        InvalidateHandle {
            notify: Arc::clone(&self.invalidate),
        }
    }

    /// Handle for requesting shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// The current focus ring (snapshot for diagnostics).
    pub fn focus_ring(&self) -> &FocusRing {
        &self.ring
    }

    /// Render-cache statistics.
    pub fn cache_stats(&self) -> crate::surface::CacheStats {
        self.cache.stats()
    }

    /// The node arena (snapshot reads for tests and diagnostics).
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// The root node of the base tree, if a frame has run.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Show a popup anchored to a node of the base tree.
    pub fn show_popup(&mut self, anchor: NodeId, widget: Widget, modal: bool) {
        self.popups.push(Popup {
            anchor,
            anchor_generation: self.arena.generation(anchor),
            widget,
            root: None,
            modal,
        });
        self.needs_frame = true;
    }

    /// Dismiss the topmost popup.
    pub fn dismiss_popup(&mut self) {
        if let Some(popup) = self.popups.pop() {
            if let Some(root) = popup.root {
                for id in self.arena.remove_subtree(root) {
                    self.cache.invalidate(id);
                }
            }
            self.needs_frame = true;
        }
    }

    /// Whether any popup is open.
    pub fn has_popup(&self) -> bool {
        !self.popups.is_empty()
    }

    /// Clear the app-level failure state so the next frame runs the
    /// builder again.
    pub fn clear_error(&mut self) {
        self.rescue_error = None;
        self.needs_frame = true;
    }

    /// Run the loop until shutdown or adapter closure.
    pub async fn run(&mut self) -> Result<()> {
        self.adapter.enter_tui_mode().await?;
        let result = self.run_inner().await;
        // Cleanly restore the terminal even when the loop errored.
        let exit = self.adapter.exit_tui_mode().await;
        result.and(exit)
    }

    async fn run_inner(&mut self) -> Result<()> {
        self.frame().await?;
        loop {
            tokio::select! {
                maybe = self.events.recv() => {
                    match maybe {
                        Some(event) => {
                            self.dispatch(event);
                            // Events arriving in the same tick dispatch
                            // in arrival order before the next render.
                            while let Ok(event) = self.events.try_recv() {
                                self.dispatch(event);
                            }
                        }
                        None => {
                            debug!("input channel closed; shutting down");
                            return Ok(());
                        }
                    }
                }
                _ = self.invalidate.notified() => {
                    self.needs_frame = true;
                }
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        // Final flush so the last state is visible.
                        self.frame().await?;
                        return Ok(());
                    }
                }
            }
            self.matcher.expire();
            if self.needs_frame {
                self.frame().await?;
            }
        }
    }

    /// Feed one event through the dispatch pipeline. `run` does this
    /// internally from the adapter channel; embedders driving their own
    /// loop call it directly.
    pub fn handle_event(&mut self, event: Event) {
        self.dispatch(event);
    }

    /// Run exactly one frame (used by tests and by `run`).
    pub async fn frame(&mut self) -> Result<()> {
        let size = self.adapter.size();
        if size != self.size {
            self.handle_resize(size.width, size.height);
        }

        // Build + reconcile.
        let widget = self.build_widget();
        let mut removed = Vec::new();
        let root = reconcile(&mut self.arena, self.root, &widget, &mut removed);
        self.root = Some(root);

        // Layout.
        let screen = Rect::new(0, 0, self.size.width, self.size.height);
        measure(&mut self.arena, root, Constraints::tight(self.size));
        arrange(&mut self.arena, root, screen, screen, 0);

        // Popups: reconcile, lay out against their anchors, collect
        // roots for focus and render. Stale anchors dismiss the popup.
        let popup_roots = self.process_popups(&mut removed);
        for id in &removed {
            self.cache.invalidate(*id);
        }

        // Focus ring: base tree first, then popups on top.
        let mut roots = vec![root];
        roots.extend(popup_roots.iter().copied());
        self.ring.rebuild_roots(&mut self.arena, &roots);
        self.grab_popup_focus(&popup_roots);

        // Render + compose.
        let base = render_root(&mut self.arena, root, &mut self.cache);
        let mut composite = CompositeSurface::new(self.size.width, self.size.height);
        composite.push_layer((*base).clone(), Position::new(0, 0), true);
        for &popup_root in &popup_roots {
            let origin = self
                .arena
                .get(popup_root)
                .map(|n| n.bounds.position)
                .unwrap_or_default();
            let surface = render_root(&mut self.arena, popup_root, &mut self.cache);
            composite.push_layer((*surface).clone(), origin, true);
        }
        let curr = composite.flatten();

        // Diff + emit.
        let diff = self.comparer.diff(&self.prev, &curr);
        let bytes = self.encoder.encode(&diff);
        if !bytes.is_empty() {
            self.adapter.write(&bytes).await?;
            self.adapter.flush().await?;
        }
        self.prev = curr;
        self.arena.clear_dirty();
        self.needs_frame = false;
        Ok(())
    }

    fn build_widget(&mut self) -> Widget {
        if let Some(message) = &self.rescue_error {
            return Widget::text(format!("application error: {message}"));
        }
        match (self.builder)() {
            Ok(widget) => widget,
            Err(e) => {
                warn!(error = %e, "widget builder failed");
                let message = e.to_string();
                self.rescue_error = Some(message.clone());
                Widget::text(format!("application error: {message}"))
            }
        }
    }

    fn handle_resize(&mut self, width: u16, height: u16) {
        self.size = Size::new(width, height);
        // The terminal content after a resize is unknown; repaint from
        // a blank baseline. The encoder's dimension-mismatch path turns
        // this into a full repaint.
        self.prev = Surface::new(0, 0);
        self.needs_frame = true;
    }

    fn dispatch(&mut self, event: Event) {
        self.needs_frame = true;
        match event {
            Event::Resize(w, h) => self.handle_resize(w, h),
            Event::Key(key) => self.dispatch_key(key),
            Event::Mouse(mouse) => self.dispatch_mouse(mouse),
            Event::Paste(text) => {
                if let Some(focused) = self.ring.focused() {
                    if let Err(e) = handle_paste(&mut self.arena, focused, &text) {
                        self.route_error(e);
                    }
                }
            }
            Event::FocusGained | Event::FocusLost => {}
        }
    }

    fn dispatch_key(&mut self, key: KeyEvent) {
        match self.matcher.press(&key) {
            ChordResult::Complete(action) => {
                if let Err(e) = action() {
                    self.route_error(e);
                }
            }
            ChordResult::Pending => {}
            ChordResult::NoMatch => self.dispatch_unbound_key(key),
        }
    }

    fn dispatch_unbound_key(&mut self, key: KeyEvent) {
        // Escape dismisses the topmost popup.
        if key.code == KeyCode::Escape && self.has_popup() {
            self.dismiss_popup();
            return;
        }
        if key.code == KeyCode::Tab {
            if key.modifiers.contains(Modifiers::SHIFT) {
                self.ring.focus_previous(&mut self.arena);
            } else {
                self.ring.focus_next(&mut self.arena);
            }
            return;
        }
        if let Some(focused) = self.ring.focused() {
            match handle_key(&mut self.arena, focused, &key) {
                Ok(_) => {}
                Err(e) => self.route_error(e),
            }
        }
    }

    fn dispatch_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Press => {
                let Some(hit) = hit_test(&self.arena, &self.ring, mouse.x, mouse.y) else {
                    return;
                };
                // A modal popup swallows clicks outside itself.
                if let Some(modal_root) = self.topmost_modal_root() {
                    if !self.arena.doc_order(modal_root).contains(&hit) {
                        return;
                    }
                }
                self.ring.set_focus(&mut self.arena, hit);
                let bounds = self
                    .arena
                    .get(hit)
                    .map(|n| n.hit_bounds)
                    .unwrap_or(Rect::ZERO);
                let rel_x = mouse.x.saturating_sub(bounds.x());
                let rel_y = mouse.y.saturating_sub(bounds.y());
                if let Err(e) = handle_click(&mut self.arena, hit, rel_x, rel_y) {
                    self.route_error(e);
                }
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                let Some(root) = self.root else { return };
                if let Some(target) = scroll_target(&self.arena, root, mouse.x, mouse.y) {
                    let delta = if mouse.kind == MouseEventKind::ScrollUp {
                        -1
                    } else {
                        1
                    };
                    handle_wheel(&mut self.arena, target, delta);
                }
            }
            _ => {}
        }
    }

    /// Contain a callback failure to the nearest rescue boundary above
    /// the focused node; with no boundary, the whole screen shows the
    /// app-level fallback.
    fn route_error(&mut self, error: BraidError) {
        warn!(error = %error, "user callback failed");
        let focused = self.ring.focused();
        let boundary = focused.and_then(|id| self.nearest_rescue(id));
        match boundary {
            Some(rescue) => {
                if let Some(node) = self.arena.get_mut(rescue) {
                    node.state = NodeState::Rescue(RescueState {
                        failed: true,
                        message: Some(error.to_string()),
                    });
                    node.dirty = true;
                }
            }
            None => {
                self.rescue_error = Some(error.to_string());
            }
        }
        self.needs_frame = true;
    }

    fn nearest_rescue(&self, target: NodeId) -> Option<NodeId> {
        let root = self.root?;
        let mut path = Vec::new();
        if !find_path(&self.arena, root, target, &mut path) {
            return None;
        }
        path.iter()
            .rev()
            .copied()
            .find(|&id| {
                self.arena
                    .get(id)
                    .is_some_and(|n| matches!(n.widget, Widget::Rescue(_)))
            })
    }

    fn topmost_modal_root(&self) -> Option<NodeId> {
        self.popups
            .iter()
            .rev()
            .find(|p| p.modal)
            .and_then(|p| p.root)
    }

    fn process_popups(&mut self, removed: &mut Vec<NodeId>) -> Vec<NodeId> {
        let screen = Rect::new(0, 0, self.size.width, self.size.height);
        let mut roots = Vec::new();
        let mut stale = Vec::new();
        for (index, popup) in self.popups.iter_mut().enumerate() {
            // Anchor staleness: reconcile may have replaced the anchor
            // node (same slot, new generation) or removed it entirely.
            // Either way the popup has nothing to hang off; dismiss it.
            let anchor_alive = self.arena.contains(popup.anchor)
                && self.arena.generation(popup.anchor) == popup.anchor_generation;
            let Some(anchor_bounds) =
                anchor_alive.then(|| self.arena.get(popup.anchor).map(|n| n.bounds)).flatten()
            else {
                stale.push(index);
                continue;
            };
            let root = reconcile(&mut self.arena, popup.root, &popup.widget, removed);
            popup.root = Some(root);

            let max = Size::new(self.size.width, self.size.height);
            let size = measure(&mut self.arena, root, Constraints::loose(max));
            // Prefer below the anchor; flip above when there is no room.
            let below = anchor_bounds.bottom();
            let y = if below + size.height <= self.size.height {
                below
            } else {
                anchor_bounds.y().saturating_sub(size.height)
            };
            let x = anchor_bounds
                .x()
                .min(self.size.width.saturating_sub(size.width));
            let rect = Rect::new(x, y, size.width, size.height);
            arrange(&mut self.arena, root, rect, screen, 0);
            roots.push(root);
        }
        for index in stale.into_iter().rev() {
            let popup = self.popups.remove(index);
            if let Some(root) = popup.root {
                removed.extend(self.arena.remove_subtree(root));
            }
            debug!("dismissed popup with stale anchor");
        }
        roots
    }

    fn grab_popup_focus(&mut self, popup_roots: &[NodeId]) {
        let Some(&top) = popup_roots.last() else {
            return;
        };
        let focused = self.ring.focused();
        let in_popup =
            focused.is_some_and(|id| self.arena.doc_order(top).contains(&id));
        if in_popup {
            return;
        }
        let first = self
            .arena
            .doc_order(top)
            .into_iter()
            .find(|&id| self.arena.get(id).is_some_and(|n| n.widget.is_focusable()));
        if let Some(first) = first {
            self.ring.set_focus(&mut self.arena, first);
        }
    }
}

fn find_path(arena: &NodeArena, current: NodeId, target: NodeId, path: &mut Vec<NodeId>) -> bool {
    path.push(current);
    if current == target {
        return true;
    }
    let children = arena
        .get(current)
        .map(|n| n.children.clone())
        .unwrap_or_default();
    for child in children {
        if find_path(arena, child, target, path) {
            return true;
        }
    }
    path.pop();
    false
}
