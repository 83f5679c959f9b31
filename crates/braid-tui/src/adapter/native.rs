//! Native tty adapter: the process's own stdin/stdout.
//!
//! Outbound bytes go through a bounded channel drained by an output
//! pump task that owns stdout; a full channel applies backpressure to
//! the render loop. Inbound events come from crossterm's event stream
//! on a second task. Resize arrives as a crossterm event.

use async_trait::async_trait;
use crossterm::execute;
use crossterm::terminal::{
    self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::caps::Capabilities;
use crate::error::{BraidError, Result};
use crate::event::Event;
use crate::geometry::Size;

use super::{Adapter, CHANNEL_CAPACITY};

enum OutMsg {
    Bytes(Vec<u8>),
    Flush,
}

/// Adapter for the process's controlling terminal.
pub struct NativeAdapter {
    out_tx: mpsc::Sender<OutMsg>,
    events_rx: Option<mpsc::Receiver<Event>>,
    caps: Capabilities,
    size: Size,
    out_task: tokio::task::JoinHandle<()>,
    in_task: tokio::task::JoinHandle<()>,
    tui_mode: bool,
}

impl NativeAdapter {
    /// Create an adapter on stdin/stdout. Fails when stdout is not a
    /// tty.
    pub fn new() -> Result<Self> {
        let (width, height) = terminal::size()?;
        let caps = Capabilities::detect();

        // Output pump: the only writer to stdout.
        let (out_tx, mut out_rx) = mpsc::channel::<OutMsg>(CHANNEL_CAPACITY);
        let out_task = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(msg) = out_rx.recv().await {
                let result = match msg {
                    OutMsg::Bytes(bytes) => stdout.write_all(&bytes).await,
                    OutMsg::Flush => stdout.flush().await,
                };
                if let Err(e) = result {
                    debug!(error = %e, "stdout write failed; output pump stopping");
                    break;
                }
            }
        });

        // Input pump: crossterm's decoder feeding our event type.
        let (events_tx, events_rx) = mpsc::channel::<Event>(CHANNEL_CAPACITY);
        let in_task = tokio::spawn(async move {
            let mut stream = crossterm::event::EventStream::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(ct) => {
                        if events_tx.send(ct.into()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "input stream error; input pump stopping");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            out_tx,
            events_rx: Some(events_rx),
            caps,
            size: Size::new(width, height),
            out_task,
            in_task,
            tui_mode: false,
        })
    }
}

impl Drop for NativeAdapter {
    fn drop(&mut self) {
        if self.tui_mode {
            // Last-resort restore if exit_tui_mode was skipped.
            let _ = disable_raw_mode();
            let _ = execute!(std::io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
        }
        self.out_task.abort();
        self.in_task.abort();
    }
}

#[async_trait]
impl Adapter for NativeAdapter {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.out_tx
            .send(OutMsg::Bytes(bytes.to_vec()))
            .await
            .map_err(|_| BraidError::AdapterClosed)
    }

    async fn flush(&mut self) -> Result<()> {
        self.out_tx
            .send(OutMsg::Flush)
            .await
            .map_err(|_| BraidError::AdapterClosed)
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<Event>> {
        self.events_rx.take()
    }

    fn size(&self) -> Size {
        self.size
    }

    fn capabilities(&self) -> Capabilities {
        self.caps.clone()
    }

    async fn enter_tui_mode(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
        if self.caps.mouse {
            execute!(stdout, crossterm::event::EnableMouseCapture)?;
        }
        if self.caps.bracketed_paste {
            execute!(stdout, crossterm::event::EnableBracketedPaste)?;
        }
        if self.caps.focus_reporting {
            execute!(stdout, crossterm::event::EnableFocusChange)?;
        }
        self.tui_mode = true;
        Ok(())
    }

    async fn exit_tui_mode(&mut self) -> Result<()> {
        let mut stdout = std::io::stdout();
        if self.caps.focus_reporting {
            let _ = execute!(stdout, crossterm::event::DisableFocusChange);
        }
        if self.caps.bracketed_paste {
            let _ = execute!(stdout, crossterm::event::DisableBracketedPaste);
        }
        if self.caps.mouse {
            let _ = execute!(stdout, crossterm::event::DisableMouseCapture);
        }
        execute!(stdout, LeaveAlternateScreen, crossterm::cursor::Show)?;
        disable_raw_mode()?;
        self.tui_mode = false;
        Ok(())
    }
}
