// SSE decoder — turns a chat-completion byte stream into `data:` payloads.

/// One complete server-sent event from a chat-completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// The joined `data:` lines of one event.
    Data(String),
    /// The `[DONE]` sentinel. Nothing meaningful follows it.
    Done,
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across network chunks decode correctly. Lines that are
/// still not valid UTF-8 are dropped. Only `data:` fields are kept; `event:`,
/// `id:`, `retry:` and comment lines are ignored since chat completions do not
/// use them.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and collect every event they complete.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let Ok(line) = String::from_utf8(line) else {
                tracing::warn!("dropping SSE line with invalid UTF-8");
                continue;
            };
            if line.is_empty() {
                frames.extend(self.dispatch());
            } else {
                self.process_line(&line);
            }
        }

        frames
    }

    /// Flush an event left open when the body ends without a trailing blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            match String::from_utf8(rest) {
                Ok(line) => self.process_line(line.trim_end_matches('\r')),
                Err(_) => tracing::warn!("dropping trailing SSE bytes with invalid UTF-8"),
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data_lines.push(value.to_string());
        }
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        if data.trim() == "[DONE]" {
            Some(SseFrame::Done)
        } else {
            Some(SseFrame::Data(data))
        }
    }
}
