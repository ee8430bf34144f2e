//! Incremental Server-Sent-Events framing.
//!
//! Events are blocks separated by a blank line (`\n\n` or `\r\n\r\n`);
//! within a block, `event:`, `data:`, and `id:` lines are recognized.
//! `SseEventParser` consumes arbitrary byte chunks and only emits complete
//! blocks, keeping the trailing partial line in its buffer — feeding the
//! same stream split into any sequence of chunks must yield the same
//! sequence of events as feeding it whole.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

#[derive(Debug, Default)]
struct PartialEvent {
    event: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
    saw_any_field: bool,
}

impl PartialEvent {
    fn finish(&mut self) -> SseEvent {
        let event = SseEvent { event: self.event.take(), data: self.data_lines.join("\n"), id: self.id.take() };
        self.data_lines.clear();
        self.saw_any_field = false;
        event
    }
}

#[derive(Debug, Default)]
pub struct SseEventParser {
    buffer: Vec<u8>,
    current: PartialEvent,
}

impl SseEventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes (UTF-8, tolerant of malformed sequences)
    /// and return any complete events found. Incomplete trailing data is
    /// retained in the internal buffer for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        loop {
            let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                break;
            };
            let mut raw_line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            raw_line.pop(); // trailing '\n'
            if raw_line.last() == Some(&b'\r') {
                raw_line.pop();
            }
            let line = String::from_utf8_lossy(&raw_line).into_owned();

            if line.is_empty() {
                if self.current.saw_any_field {
                    events.push(self.current.finish());
                }
                continue;
            }

            self.current.saw_any_field = true;
            if let Some(rest) = line.strip_prefix("event:") {
                self.current.event = Some(rest.trim_start().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                self.current.data_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            } else if let Some(rest) = line.strip_prefix("id:") {
                self.current.id = Some(rest.trim_start().to_string());
            }
            // unrecognized field lines are ignored, per SSE framing rules
        }
        events
    }
}
