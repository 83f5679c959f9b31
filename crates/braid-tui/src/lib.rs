//! braid-tui: a declarative terminal UI runtime.
//!
//! Applications describe a screen as a tree of immutable [`Widget`]s;
//! the runtime reconciles that tree against persistent nodes, lays them
//! out with a constraint-based measure/arrange pass, renders onto
//! [`Surface`]s, and emits the minimal ANSI diff to the terminal.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │   (builder closure → Widget tree, chord bindings, popups)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Node Tree & Reconciler (node)                │
//! │  persistent nodes vs. fresh widgets; state survives frames  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Layout (layout + node)                     │
//! │    Constraints → Measure → Arrange → bounds / hit bounds    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Surfaces & Compositing (surface)               │
//! │   per-node render cache, popup layers, CompositeSurface     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Diff → ANSI Encoder (surface::diff)            │
//! │     change runs, SGR deltas, OSC 8 links, trailing reset    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    I/O Adapters (adapter)                   │
//! │      native tty / PTY child / headless / inline region      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Input flows the other way: adapter event channels feed the app
//! loop, which routes keys through the chord trie and the focus ring,
//! and mouse events through hit-testing (see [`input`]).
//!
//! The cell model (grapheme clusters, display widths, styles, tracked
//! hyperlinks and Sixels) and the embedded virtual terminal come from
//! the `braid-term` crate; the PTY adapter owns a
//! [`braid_term::VirtualTerminal`] that child-process output is fed
//! into.

pub mod adapter;
pub mod app;
pub mod caps;
pub mod error;
pub mod event;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod node;
pub mod surface;
pub mod testing;
pub mod time;
pub mod widget;

pub use adapter::{Adapter, HeadlessAdapter, HeadlessHandle, InlineAdapter, NativeAdapter, PtyAdapter};
pub use app::{App, BuildFn, InvalidateHandle, ShutdownHandle};
pub use caps::{Capabilities, ColorSupport};
pub use error::{BraidError, Result};
pub use event::{Event, KeyCode, KeyEvent, Modifiers, MouseEvent, MouseEventKind};
pub use geometry::{Position, Rect, Size};
pub use input::{Binding, ChordMatcher, ChordResult, FocusRing};
pub use layout::{Constraints, LayoutHints, SizeHint, UNBOUNDED};
pub use node::{Node, NodeArena, NodeId, NodeState};
pub use surface::{
    AnsiEncoder, CacheStats, Comparer, CompositeSurface, DiffRun, GAP_COALESCE, RenderCache,
    Surface, SurfaceDiff,
};
pub use time::{Clock, SystemClock, TestClock};
pub use widget::{Handler, Widget, WidgetKind};

// Re-export the cell model so applications need only one import path.
pub use braid_term::{Attrs, Cell, Color, NamedColor, Style};
