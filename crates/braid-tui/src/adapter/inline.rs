//! Inline adapter: a UI occupying a few rows of the normal screen.
//!
//! Wraps another adapter at a row origin. Outbound absolute
//! cursor-position sequences are rewritten to add the origin row, and
//! inbound mouse rows are translated back, so the wrapped application
//! believes it owns rows `0..height`. The alternate screen is never
//! entered; the UI lives in the scrollback like ordinary output.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::caps::Capabilities;
use crate::error::Result;
use crate::event::Event;
use crate::geometry::Size;

use super::{Adapter, CHANNEL_CAPACITY};

/// An adapter writing into a sub-region of another adapter.
pub struct InlineAdapter {
    inner: Box<dyn Adapter>,
    origin_row: u16,
    height: u16,
    events_rx: Option<mpsc::Receiver<Event>>,
    forward: Option<tokio::task::JoinHandle<()>>,
}

impl InlineAdapter {
    /// Wrap `inner`, placing the UI at `origin_row` with `height` rows.
    pub fn new(mut inner: Box<dyn Adapter>, origin_row: u16, height: u16) -> Self {
        // Translate inbound mouse rows into region coordinates; events
        // above or below the region are dropped.
        let (events_rx, forward) = match inner.take_events() {
            Some(mut upstream) => {
                let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
                let handle = tokio::spawn(async move {
                    while let Some(event) = upstream.recv().await {
                        let translated = match event {
                            Event::Mouse(mut m) => {
                                if m.y < origin_row || m.y >= origin_row + height {
                                    continue;
                                }
                                m.y -= origin_row;
                                Event::Mouse(m)
                            }
                            Event::Resize(w, _) => Event::Resize(w, height),
                            other => other,
                        };
                        if tx.send(translated).await.is_err() {
                            break;
                        }
                    }
                });
                (Some(rx), Some(handle))
            }
            None => (None, None),
        };
        Self {
            inner,
            origin_row,
            height,
            events_rx,
            forward,
        }
    }

    /// The region's first row on the wrapped adapter.
    pub fn origin_row(&self) -> u16 {
        self.origin_row
    }
}

impl Drop for InlineAdapter {
    fn drop(&mut self) {
        if let Some(task) = self.forward.take() {
            task.abort();
        }
    }
}

/// Rewrite absolute cursor-position rows (`CSI row ; col H`) by adding
/// `origin`. Everything else passes through byte-for-byte.
pub(crate) fn offset_cursor_rows(bytes: &[u8], origin: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 16);
    let mut i = 0;
    while i < bytes.len() {
        // Look for CSI.
        if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'[') {
            let start = i;
            let mut j = i + 2;
            while j < bytes.len() && !(0x40..=0x7e).contains(&bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && (bytes[j] == b'H' || bytes[j] == b'f') {
                let params = &bytes[i + 2..j];
                if let Some(rewritten) = rewrite_cup(params, origin) {
                    out.extend_from_slice(b"\x1b[");
                    out.extend_from_slice(rewritten.as_bytes());
                    out.push(bytes[j]);
                    i = j + 1;
                    continue;
                }
            }
            // Not a CUP (or unparsable): copy the sequence verbatim.
            let end = (j + 1).min(bytes.len());
            out.extend_from_slice(&bytes[start..end]);
            i = end;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

fn rewrite_cup(params: &[u8], origin: u16) -> Option<String> {
    let text = std::str::from_utf8(params).ok()?;
    if !text.chars().all(|c| c.is_ascii_digit() || c == ';') {
        return None;
    }
    let mut parts = text.splitn(2, ';');
    let row: u16 = match parts.next() {
        Some("") | None => 1,
        Some(p) => p.parse().ok()?,
    };
    let col = parts.next().unwrap_or("1");
    let col = if col.is_empty() { "1" } else { col };
    Some(format!("{};{}", row + origin, col))
}

#[async_trait]
impl Adapter for InlineAdapter {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let rewritten = offset_cursor_rows(bytes, self.origin_row);
        self.inner.write(&rewritten).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<Event>> {
        self.events_rx.take()
    }

    fn size(&self) -> Size {
        Size::new(self.inner.size().width, self.height)
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    async fn enter_tui_mode(&mut self) -> Result<()> {
        // No alternate screen for inline UI; just park the cursor.
        self.inner.write(b"\x1b[?25l").await
    }

    async fn exit_tui_mode(&mut self) -> Result<()> {
        // Leave the cursor on the row after the region.
        let park = format!("\x1b[{};1H\x1b[?25h", self.origin_row + self.height + 1);
        self.inner.write(park.as_bytes()).await?;
        self.inner.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::HeadlessAdapter;
    use crate::event::{MouseEvent, MouseEventKind, Modifiers};

    #[test]
    fn cup_rows_are_offset() {
        let out = offset_cursor_rows(b"\x1b[1;1HHi\x1b[2;5H!", 10);
        assert_eq!(out, b"\x1b[11;1HHi\x1b[12;5H!".to_vec());
    }

    #[test]
    fn bare_cup_defaults_to_home() {
        let out = offset_cursor_rows(b"\x1b[H", 3);
        assert_eq!(out, b"\x1b[4;1H".to_vec());
    }

    #[test]
    fn non_cup_sequences_untouched() {
        let bytes = b"\x1b[1mbold\x1b[0m\x1b[?25l";
        let out = offset_cursor_rows(bytes, 5);
        assert_eq!(out, bytes.to_vec());
    }

    #[test]
    fn private_cup_like_sequences_untouched() {
        // DECSET ends in 'h', not 'H'; must pass through.
        let bytes = b"\x1b[?1049h";
        assert_eq!(offset_cursor_rows(bytes, 5), bytes.to_vec());
    }

    #[tokio::test]
    async fn writes_are_rewritten_through_inner() {
        let (inner, handle) = HeadlessAdapter::new(80, 24);
        let mut inline = InlineAdapter::new(Box::new(inner), 20, 4);
        inline.write(b"\x1b[1;1Hstatus").await.ok();
        assert_eq!(handle.take_output(), b"\x1b[21;1Hstatus".to_vec());
        assert_eq!(inline.size(), Size::new(80, 4));
    }

    #[tokio::test]
    async fn mouse_rows_translate_and_filter() {
        let (inner, handle) = HeadlessAdapter::new(80, 24);
        let mut inline = InlineAdapter::new(Box::new(inner), 20, 4);
        let mut events = match inline.take_events() {
            Some(rx) => rx,
            None => panic!("events already taken"),
        };
        let mouse = |y| {
            Event::Mouse(MouseEvent {
                kind: MouseEventKind::Press,
                x: 3,
                y,
                modifiers: Modifiers::NONE,
            })
        };
        handle.inject(mouse(2)).await.ok(); // above region: dropped
        handle.inject(mouse(21)).await.ok(); // row 21 -> region row 1
        let got = events.recv().await;
        match got {
            Some(Event::Mouse(m)) => assert_eq!(m.y, 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
