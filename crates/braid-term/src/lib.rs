//! braid-term: an in-memory virtual terminal.
//!
//! This crate models the terminal a child process or recorded session
//! writes into: a grid of styled cells driven by a VT/ANSI parser, with
//! scrollback, an alternate screen, tracked out-of-band objects
//! (hyperlinks, Sixel images), reflow on resize, immutable snapshots,
//! and the asciicast v2 recording format.
//!
//! # Pipeline
//!
//! ```text
//! bytes ──► Parser (vte state machine + dispatch) ──► TermOp
//!                                                       │
//!                                                       ▼
//!              VirtualTerminal { primary grid, alt grid, scrollback,
//!                                cursor, pen, modes, tracked tables }
//!                                                       │
//!                            snapshot() ◄───────────────┤
//!                                                       ▼
//!                        resize() ──► reflow (logical-line re-wrap)
//! ```
//!
//! The terminal is single-writer: whoever owns it feeds bytes and
//! resizes it. Snapshots are the read path for everything else —
//! assertions, exports, and recording seeds — and pin tracked objects
//! via their refcounted handles.

pub mod cast;
pub mod cell;
pub mod color;
pub mod error;
pub mod grid;
pub mod parser;
pub mod reflow;
pub mod snapshot;
pub mod style;
pub mod term;
pub mod tracked;

pub use cast::{Cast, CastEvent, CastEventKind, CastHeader, CastWriter, TimeSource, WallClock};
pub use cell::{Cell, display_width, graphemes};
pub use color::{Color, NamedColor};
pub use error::{Result, TermError};
pub use grid::{Grid, Row};
pub use parser::{EraseMode, Mode, Parser, SgrOp, TermOp};
pub use reflow::ReflowStrategy;
pub use snapshot::TermSnapshot;
pub use style::{Attrs, Style};
pub use term::{CursorPos, ModeFlags, MouseLevel, ReplySink, VirtualTerminal};
pub use tracked::{Hyperlink, LinkHandle, SixelHandle, SixelImage, TrackedId, TrackedTable};
