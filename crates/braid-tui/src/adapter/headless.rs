//! In-memory adapter for tests and recordings.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::caps::Capabilities;
use crate::error::Result;
use crate::event::Event;
use crate::geometry::Size;

use super::{Adapter, CHANNEL_CAPACITY};

/// An adapter that writes into a buffer and takes injected events.
pub struct HeadlessAdapter {
    output: Arc<Mutex<Vec<u8>>>,
    size: Arc<Mutex<Size>>,
    caps: Capabilities,
    events_tx: mpsc::Sender<Event>,
    events_rx: Option<mpsc::Receiver<Event>>,
    tui_mode: Arc<Mutex<bool>>,
}

/// Test-side handle: inject events, resize, and read output.
#[derive(Clone)]
pub struct HeadlessHandle {
    output: Arc<Mutex<Vec<u8>>>,
    size: Arc<Mutex<Size>>,
    events_tx: mpsc::Sender<Event>,
    tui_mode: Arc<Mutex<bool>>,
}

impl HeadlessAdapter {
    /// Create an adapter of the given size with default capabilities.
    pub fn new(width: u16, height: u16) -> (Self, HeadlessHandle) {
        Self::with_capabilities(width, height, Capabilities::default())
    }

    /// Create an adapter advertising specific capabilities.
    pub fn with_capabilities(
        width: u16,
        height: u16,
        caps: Capabilities,
    ) -> (Self, HeadlessHandle) {
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let output = Arc::new(Mutex::new(Vec::new()));
        let size = Arc::new(Mutex::new(Size::new(width, height)));
        let tui_mode = Arc::new(Mutex::new(false));
        let handle = HeadlessHandle {
            output: Arc::clone(&output),
            size: Arc::clone(&size),
            events_tx: events_tx.clone(),
            tui_mode: Arc::clone(&tui_mode),
        };
        (
            Self {
                output,
                size,
                caps,
                events_tx,
                events_rx: Some(events_rx),
                tui_mode,
            },
            handle,
        )
    }
}

impl HeadlessHandle {
    /// Inject an input event (async; awaits channel capacity).
    pub async fn inject(&self, event: Event) -> Result<()> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| crate::error::BraidError::AdapterClosed)
    }

    /// Inject without awaiting; drops the event if the channel is full.
    pub fn try_inject(&self, event: Event) -> bool {
        self.events_tx.try_send(event).is_ok()
    }

    /// Resize the terminal and deliver the resize event.
    pub async fn resize(&self, width: u16, height: u16) -> Result<()> {
        if let Ok(mut size) = self.size.lock() {
            *size = Size::new(width, height);
        }
        self.inject(Event::Resize(width, height)).await
    }

    /// Take everything written so far.
    pub fn take_output(&self) -> Vec<u8> {
        self.output
            .lock()
            .map(|mut out| std::mem::take(&mut *out))
            .unwrap_or_default()
    }

    /// Bytes written so far, without draining.
    pub fn output_len(&self) -> usize {
        self.output.lock().map(|out| out.len()).unwrap_or(0)
    }

    /// Whether the app is currently in TUI mode.
    pub fn in_tui_mode(&self) -> bool {
        self.tui_mode.lock().map(|m| *m).unwrap_or(false)
    }
}

#[async_trait]
impl Adapter for HeadlessAdapter {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if let Ok(mut out) = self.output.lock() {
            out.extend_from_slice(bytes);
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<Event>> {
        self.events_rx.take()
    }

    fn size(&self) -> Size {
        self.size.lock().map(|s| *s).unwrap_or_default()
    }

    fn capabilities(&self) -> Capabilities {
        self.caps.clone()
    }

    async fn enter_tui_mode(&mut self) -> Result<()> {
        if let Ok(mut mode) = self.tui_mode.lock() {
            *mode = true;
        }
        Ok(())
    }

    async fn exit_tui_mode(&mut self) -> Result<()> {
        if let Ok(mut mode) = self.tui_mode.lock() {
            *mode = false;
        }
        Ok(())
    }
}
