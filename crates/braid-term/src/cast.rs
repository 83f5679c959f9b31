//! asciicast v2 recording format.
//!
//! A recording is JSONL: one header object, then one `[time, code, data]`
//! array per event, where `code` is `"o"` for output and `"i"` for input.
//! Timestamps are seconds relative to the start of the recording and come
//! from an injected [`TimeSource`] so tests can drive them manually.

use std::io::{self, BufRead, Write};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TermError};
use crate::snapshot::TermSnapshot;

/// Monotonic clock feeding event timestamps.
pub trait TimeSource: Send {
    /// Seconds elapsed since the recording started.
    fn elapsed_secs(&mut self) -> f64;
}

/// Wall-clock time source.
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    /// Start counting now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn elapsed_secs(&mut self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// The asciicast v2 header line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CastHeader {
    /// Format version; always 2.
    pub version: u32,
    /// Terminal width in columns.
    pub width: u16,
    /// Terminal height in rows.
    pub height: u16,
    /// Optional recording title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One event row.
#[derive(Clone, Debug, PartialEq)]
pub struct CastEvent {
    /// Seconds since the start of the recording.
    pub time: f64,
    /// Event kind.
    pub kind: CastEventKind,
    /// Event payload (UTF-8; raw bytes are recorded lossily).
    pub data: String,
}

/// Event direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastEventKind {
    /// Data written to the terminal.
    Output,
    /// Data read from the user.
    Input,
}

impl CastEventKind {
    fn code(self) -> &'static str {
        match self {
            CastEventKind::Output => "o",
            CastEventKind::Input => "i",
        }
    }
}

/// Streaming asciicast writer.
pub struct CastWriter<W: Write> {
    out: W,
    clock: Box<dyn TimeSource>,
}

impl<W: Write> CastWriter<W> {
    /// Write the header and return a writer ready for events.
    pub fn new(
        mut out: W,
        width: u16,
        height: u16,
        title: Option<String>,
        clock: Box<dyn TimeSource>,
    ) -> Result<Self> {
        let header = CastHeader {
            version: 2,
            width,
            height,
            title,
        };
        let line = serde_json::to_string(&header)
            .map_err(|e| TermError::Recording(e.to_string()))?;
        writeln!(out, "{line}")?;
        Ok(Self { out, clock })
    }

    /// Start a recording seeded with the current screen content.
    ///
    /// The snapshot is emitted as a synthetic first output event that
    /// clears and repaints the grid, so playback starting mid-session
    /// shows the full screen immediately.
    pub fn with_snapshot(
        out: W,
        snapshot: &TermSnapshot,
        title: Option<String>,
        clock: Box<dyn TimeSource>,
    ) -> Result<Self> {
        let mut writer = Self::new(out, snapshot.width, snapshot.height, title, clock)?;
        writer.output(&snapshot.to_ansi())?;
        Ok(writer)
    }

    /// Record bytes written to the terminal.
    pub fn output(&mut self, data: &[u8]) -> Result<()> {
        self.event(CastEventKind::Output, data)
    }

    /// Record bytes of user input.
    pub fn input(&mut self, data: &[u8]) -> Result<()> {
        self.event(CastEventKind::Input, data)
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn event(&mut self, kind: CastEventKind, data: &[u8]) -> Result<()> {
        let time = self.clock.elapsed_secs();
        let data = String::from_utf8_lossy(data);
        let row = (time, kind.code(), data.as_ref());
        let line = serde_json::to_string(&row)
            .map_err(|e| TermError::Recording(e.to_string()))?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

/// Parsed recording: header plus events.
#[derive(Clone, Debug, PartialEq)]
pub struct Cast {
    /// The header line.
    pub header: CastHeader,
    /// Event rows in file order.
    pub events: Vec<CastEvent>,
}

impl Cast {
    /// Parse an asciicast v2 stream.
    pub fn read(reader: impl io::Read) -> Result<Self> {
        let mut lines = io::BufReader::new(reader).lines();
        let header_line = lines
            .next()
            .ok_or_else(|| TermError::Recording("empty recording".into()))??;
        let header: CastHeader = serde_json::from_str(&header_line)
            .map_err(|e| TermError::Recording(format!("bad header: {e}")))?;
        if header.version != 2 {
            return Err(TermError::Recording(format!(
                "unsupported version {}",
                header.version
            )));
        }

        let mut events = Vec::new();
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (time, code, data): (f64, String, String) = serde_json::from_str(&line)
                .map_err(|e| TermError::Recording(format!("bad event row: {e}")))?;
            let kind = match code.as_str() {
                "o" => CastEventKind::Output,
                "i" => CastEventKind::Input,
                other => {
                    return Err(TermError::Recording(format!("unknown event code {other:?}")));
                }
            };
            events.push(CastEvent { time, kind, data });
        }
        Ok(Self { header, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StepClock {
        now: f64,
        step: f64,
    }

    impl TimeSource for StepClock {
        fn elapsed_secs(&mut self) -> f64 {
            let t = self.now;
            self.now += self.step;
            t
        }
    }

    fn step_clock() -> Box<dyn TimeSource> {
        Box::new(StepClock { now: 0.0, step: 0.5 })
    }

    #[test]
    fn writes_header_and_events() {
        let mut buf = Vec::new();
        let mut w = match CastWriter::new(&mut buf, 80, 24, Some("demo".into()), step_clock()) {
            Ok(w) => w,
            Err(e) => panic!("writer failed: {e}"),
        };
        assert!(w.output(b"hello").is_ok());
        assert!(w.input(b"q").is_ok());
        drop(w);

        let text = String::from_utf8_lossy(&buf);
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(r#"{"version":2,"width":80,"height":24,"title":"demo"}"#)
        );
        assert_eq!(lines.next(), Some(r#"[0.0,"o","hello"]"#));
        assert_eq!(lines.next(), Some(r#"[0.5,"i","q"]"#));
    }

    #[test]
    fn roundtrip_through_reader() {
        let mut buf = Vec::new();
        {
            let mut w = match CastWriter::new(&mut buf, 10, 4, None, step_clock()) {
                Ok(w) => w,
                Err(e) => panic!("writer failed: {e}"),
            };
            assert!(w.output(b"\x1b[1mhi\x1b[0m").is_ok());
        }
        let cast = match Cast::read(buf.as_slice()) {
            Ok(c) => c,
            Err(e) => panic!("read failed: {e}"),
        };
        assert_eq!(cast.header.width, 10);
        assert_eq!(cast.header.title, None);
        assert_eq!(cast.events.len(), 1);
        assert_eq!(cast.events[0].kind, CastEventKind::Output);
        assert_eq!(cast.events[0].data, "\x1b[1mhi\x1b[0m");
    }

    #[test]
    fn snapshot_seed_replays() {
        let mut term = match crate::term::VirtualTerminal::new(10, 2) {
            Ok(t) => t,
            Err(e) => panic!("terminal failed: {e}"),
        };
        term.feed(b"seeded");
        let snap = term.snapshot(0);

        let mut buf = Vec::new();
        {
            let w = CastWriter::with_snapshot(&mut buf, &snap, None, step_clock());
            assert!(w.is_ok());
        }
        let cast = match Cast::read(buf.as_slice()) {
            Ok(c) => c,
            Err(e) => panic!("read failed: {e}"),
        };
        assert_eq!(cast.events.len(), 1);

        let mut replay = match crate::term::VirtualTerminal::new(10, 2) {
            Ok(t) => t,
            Err(e) => panic!("terminal failed: {e}"),
        };
        replay.feed(cast.events[0].data.as_bytes());
        assert_eq!(replay.screen_text(), "seeded\n");
    }

    #[test]
    fn rejects_bad_header() {
        let err = Cast::read(b"not json\n".as_slice());
        assert!(err.is_err());
        let err = Cast::read(br#"{"version":1,"width":1,"height":1}"#.as_slice());
        assert!(err.is_err());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(Cast::read(b"".as_slice()).is_err());
    }
}
