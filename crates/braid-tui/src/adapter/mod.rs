//! I/O adapters: the uniform interface between the application loop and
//! whatever sits on the other side of the tty.

mod headless;
mod inline;
mod native;
mod pty;

pub use headless::{HeadlessAdapter, HeadlessHandle};
pub use inline::InlineAdapter;
pub use native::NativeAdapter;
pub use pty::PtyAdapter;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::caps::Capabilities;
use crate::error::Result;
use crate::event::Event;
use crate::geometry::Size;

/// Default capacity of adapter channels. Writers awaiting a full
/// channel is the backpressure mechanism.
pub const CHANNEL_CAPACITY: usize = 64;

/// One side of a terminal connection.
///
/// The application loop writes frame bytes through `write`/`flush` and
/// receives decoded input through the channel from `take_events`.
/// Adapters signal closure by closing that channel, never by panicking
/// into the loop.
#[async_trait]
pub trait Adapter: Send {
    /// Queue outbound bytes. Awaits when the output channel is full.
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush queued bytes to the underlying device.
    async fn flush(&mut self) -> Result<()>;

    /// Take the inbound event channel. Yields `None` after the first
    /// call.
    fn take_events(&mut self) -> Option<mpsc::Receiver<Event>>;

    /// Current terminal dimensions.
    fn size(&self) -> Size;

    /// What the terminal can do.
    fn capabilities(&self) -> Capabilities;

    /// Switch to full-screen mode: alternate screen, cursor hidden,
    /// mouse reporting and bracketed paste per capabilities.
    async fn enter_tui_mode(&mut self) -> Result<()>;

    /// Undo `enter_tui_mode`, restoring the terminal for the shell.
    async fn exit_tui_mode(&mut self) -> Result<()>;
}
