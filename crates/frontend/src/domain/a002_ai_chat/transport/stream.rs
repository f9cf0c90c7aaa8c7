//! Incremental parser for streamed chat completions.
//!
//! Accepts SSE framing (`data: {...}` lines, `data: [DONE]`) as well as bare
//! JSON lines (Ollama). Bytes are buffered until a newline arrives, so UTF-8
//! sequences and JSON objects split across network chunks are reassembled.

use super::extract::{first_content, STREAM_EXTRACTORS};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment { delta: String, accumulated: String },
    /// Terminal marker seen (`[DONE]` or `"done": true`).
    Done { accumulated: String },
}

#[derive(Debug, Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
    accumulated: String,
    finished: bool,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// True once a terminal marker was seen; later input is ignored.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.process_line(&String::from_utf8_lossy(&line), &mut events);
            if self.finished {
                self.buffer.clear();
                break;
            }
        }
        events
    }

    /// Processes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.finished && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.process_line(&String::from_utf8_lossy(&rest), &mut events);
        }
        self.finished = true;
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            return;
        }

        let payload = if let Some(rest) = line.strip_prefix("data:") {
            rest.trim()
        } else if line.starts_with('{') {
            line
        } else {
            return;
        };

        if payload == "[DONE]" {
            self.finish_with(events);
            return;
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("stream: skipping unparsable line ({}): {}", e, payload);
                return;
            }
        };

        if let Some(delta) = first_content(&value, STREAM_EXTRACTORS) {
            self.accumulated.push_str(delta);
            events.push(StreamEvent::Fragment {
                delta: delta.to_string(),
                accumulated: self.accumulated.clone(),
            });
        }

        if value.get("done").and_then(Value::as_bool) == Some(true) {
            self.finish_with(events);
        }
    }

    fn finish_with(&mut self, events: &mut Vec<StreamEvent>) {
        self.finished = true;
        events.push(StreamEvent::Done {
            accumulated: self.accumulated.clone(),
        });
    }
}
