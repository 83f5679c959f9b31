//! PTY workload adapter: a child process running inside a virtual
//! terminal.
//!
//! The adapter owns the [`VirtualTerminal`]; a reader thread pumps raw
//! child output into a channel and the render loop applies it at the
//! start of each frame via [`PtyAdapter::pump`]. That keeps the grid
//! single-writer: only the loop thread ever mutates the terminal.
//! DSR/DA replies are wired back to the child's input automatically.

use std::io::{Read, Write};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;
use tracing::debug;

use braid_term::{ReflowStrategy, VirtualTerminal};

use crate::caps::{Capabilities, ColorSupport};
use crate::error::{BraidError, Result};
use crate::event::Event;
use crate::geometry::Size;

use super::{Adapter, CHANNEL_CAPACITY};

/// A child process attached to an in-memory terminal.
pub struct PtyAdapter {
    term: VirtualTerminal,
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    bytes_rx: std_mpsc::Receiver<Vec<u8>>,
    reader_done: bool,
    events_tx: mpsc::Sender<Event>,
    events_rx: Option<mpsc::Receiver<Event>>,
    size: Size,
}

impl PtyAdapter {
    /// Open a PTY of the given size and spawn `cmd` on it.
    pub fn spawn(
        cmd: CommandBuilder,
        size: Size,
        scrollback: usize,
        reflow: ReflowStrategy,
    ) -> Result<Self> {
        if size.is_empty() {
            return Err(BraidError::InvalidInput(format!(
                "pty size must be non-zero, got {}x{}",
                size.width, size.height
            )));
        }
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: size.height,
                cols: size.width,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(to_io)?;
        let child = pair.slave.spawn_command(cmd).map_err(to_io)?;
        let mut reader = pair.master.try_clone_reader().map_err(to_io)?;
        let writer = Arc::new(Mutex::new(pair.master.take_writer().map_err(to_io)?));

        // Blocking reader thread; the channel closing is the EOF signal.
        let (bytes_tx, bytes_rx) = std_mpsc::channel::<Vec<u8>>();
        std::thread::spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if bytes_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let mut term = VirtualTerminal::new(size.width, size.height)?
            .with_scrollback(scrollback)
            .with_reflow(reflow);
        let reply_writer = Arc::clone(&writer);
        term.set_reply_sink(Box::new(move |bytes| {
            if let Ok(mut w) = reply_writer.lock() {
                let _ = w.write_all(bytes);
                let _ = w.flush();
            }
        }));

        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        Ok(Self {
            term,
            master: pair.master,
            child,
            writer,
            bytes_rx,
            reader_done: false,
            events_tx,
            events_rx: Some(events_rx),
            size,
        })
    }

    /// Apply all queued child output to the terminal. Returns true if
    /// anything changed. Called by the loop at the start of a frame.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.bytes_rx.try_recv() {
                Ok(bytes) => {
                    self.term.feed(&bytes);
                    changed = true;
                }
                Err(std_mpsc::TryRecvError::Empty) => break,
                Err(std_mpsc::TryRecvError::Disconnected) => {
                    if !self.reader_done {
                        self.reader_done = true;
                        debug!("pty reader closed");
                    }
                    break;
                }
            }
        }
        changed
    }

    /// The terminal the child is drawing into.
    pub fn terminal(&self) -> &VirtualTerminal {
        &self.term
    }

    /// Whether the child's output stream has closed.
    pub fn is_closed(&self) -> bool {
        self.reader_done
    }

    /// Whether the child process is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Send input bytes to the child (keystrokes, paste).
    pub fn send_input(&mut self, bytes: &[u8]) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| BraidError::AdapterClosed)?;
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Forward a mouse event to the child, encoded per the reporting
    /// mode the child requested. Events the child did not ask for are
    /// silently dropped.
    pub fn send_mouse(&mut self, event: &crate::event::MouseEvent) -> Result<()> {
        let modes = self.term.modes();
        if let Some(bytes) = encode_mouse(event, modes.mouse, modes.mouse_sgr) {
            self.send_input(&bytes)?;
        }
        Ok(())
    }

    /// Resize the PTY and the terminal together.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<()> {
        self.master
            .resize(PtySize {
                rows: height,
                cols: width,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(to_io)?;
        self.term.resize(width, height)?;
        self.size = Size::new(width, height);
        let _ = self.events_tx.try_send(Event::Resize(width, height));
        Ok(())
    }

    /// Terminate the child process.
    pub fn kill(&mut self) -> Result<()> {
        self.child.kill().map_err(BraidError::Io)
    }
}

fn to_io(e: impl std::fmt::Display) -> BraidError {
    BraidError::Io(std::io::Error::other(e.to_string()))
}

/// Encode a mouse event for the child. Only the SGR encoding (`CSI <
/// btn ; col ; row M|m`) is emitted; children still on the legacy X10
/// byte encoding get nothing rather than garbled coordinates.
fn encode_mouse(
    event: &crate::event::MouseEvent,
    level: braid_term::MouseLevel,
    sgr: bool,
) -> Option<Vec<u8>> {
    use crate::event::MouseEventKind;

    if level == braid_term::MouseLevel::Off || !sgr {
        return None;
    }
    let wanted = match event.kind {
        MouseEventKind::Press | MouseEventKind::Release => true,
        MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => true,
        MouseEventKind::Drag => level >= braid_term::MouseLevel::Drag,
        MouseEventKind::Move => level >= braid_term::MouseLevel::Motion,
    };
    if !wanted {
        return None;
    }
    let (button, release) = match event.kind {
        MouseEventKind::Press => (0u16, false),
        MouseEventKind::Release => (0, true),
        MouseEventKind::Drag => (32, false),
        MouseEventKind::Move => (35, false),
        MouseEventKind::ScrollUp => (64, false),
        MouseEventKind::ScrollDown => (65, false),
    };
    let terminator = if release { 'm' } else { 'M' };
    Some(
        format!(
            "\x1b[<{};{};{}{}",
            button,
            event.x + 1,
            event.y + 1,
            terminator
        )
        .into_bytes(),
    )
}

#[async_trait]
impl Adapter for PtyAdapter {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.send_input(bytes)
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<Event>> {
        self.events_rx.take()
    }

    fn size(&self) -> Size {
        self.size
    }

    fn capabilities(&self) -> Capabilities {
        // The child draws into our emulation, which accepts everything.
        Capabilities {
            color: ColorSupport::TrueColor,
            mouse: true,
            hyperlinks: true,
            sixel: true,
            bracketed_paste: true,
            focus_reporting: true,
            reflow: self.term.reflow_strategy(),
        }
    }

    async fn enter_tui_mode(&mut self) -> Result<()> {
        Ok(())
    }

    async fn exit_tui_mode(&mut self) -> Result<()> {
        Ok(())
    }
}
