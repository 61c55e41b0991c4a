//! Incremental decoder for the `text/event-stream` wire format.

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if any. Unnamed frames are `message` events.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
}

impl SseFrame {
    /// Creates a named frame.
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    /// Returns the event name, defaulting to `message`.
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// Buffers raw body chunks and yields complete frames.
///
/// Lines may end in CRLF, LF or a bare CR, and chunk boundaries are
/// arbitrary: a line may be split anywhere, including between the two bytes
/// of a CRLF pair. A blank line dispatches the pending frame only when at
/// least one `data:` line was seen.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    /// Bytes of `buf` already searched for a line terminator.
    scanned: usize,
    /// The last chunk ended with CR; a leading LF in the next one belongs to it.
    skip_lf: bool,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, mut chunk: &[u8]) -> Vec<SseFrame> {
        if self.skip_lf && !chunk.is_empty() {
            self.skip_lf = false;
            if chunk[0] == b'\n' {
                chunk = &chunk[1..];
            }
        }
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = self.buf[self.scanned..]
            .iter()
            .position(|b| matches!(b, b'\n' | b'\r'))
        {
            let line_end = self.scanned + offset;
            let mut next = line_end + 1;
            if self.buf[line_end] == b'\r' {
                match self.buf.get(next) {
                    Some(b'\n') => next += 1,
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }
            let line = String::from_utf8_lossy(&self.buf[line_start..line_end]).into_owned();
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
            line_start = next;
            self.scanned = next;
        }
        self.buf.drain(..line_start);
        self.scanned = self.buf.len();
        frames
    }

    /// Returns true when a partial frame is still buffered.
    pub fn has_pending(&self) -> bool {
        self.event.is_some()
            || !self.data.is_empty()
            || self.buf.iter().any(|b| !b.is_ascii_whitespace())
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, rest)) => (field, rest.strip_prefix(' ').unwrap_or(rest)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // `id` and `retry` only matter for reconnection, which is not done here.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take().filter(|name| !name.is_empty());
        if self.data.is_empty() {
            return None;
        }
        Some(SseFrame {
            event,
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}
