//! Incremental event-stream decoder
//!
//! Upstream responses arrive as arbitrary byte chunks carrying lines such as
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//! data: [DONE]
//! ```
//!
//! The decoder buffers partial lines, ignores lines without the `data:` marker,
//! skips events that do not parse, and stops at the `[DONE]` sentinel.

use crate::errors::{DiagError, Result};
use serde::Deserialize;
use tracing::{debug, warn};

/// Maximum length of a single unterminated line (1MB)
pub const MAX_LINE_SIZE: usize = 1_048_576;

/// Prefix marking an event line
pub const EVENT_MARKER: &str = "data:";

/// Payload that ends the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Decoder states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No token seen yet
    AwaitingEvent,

    /// At least one token extracted
    Accumulating,

    /// Sentinel seen; further input is ignored
    Terminated,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// One decoded line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Not an event line, or an event carrying no text
    Ignored,
    /// Event line whose payload failed to parse
    Malformed,
    Token(String),
    Done,
}

/// Decode one complete line
pub fn decode_line(line: &str) -> LineEvent {
    let Some(payload) = line.strip_prefix(EVENT_MARKER) else {
        return LineEvent::Ignored;
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        return LineEvent::Done;
    }

    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(_) => return LineEvent::Malformed,
    };

    let Some(choice) = event.choices.into_iter().next() else {
        return LineEvent::Malformed;
    };

    let token = choice
        .delta
        .and_then(|d| d.content)
        .filter(|c| !c.is_empty())
        .or(choice.text)
        .unwrap_or_default();

    if token.is_empty() {
        LineEvent::Ignored
    } else {
        LineEvent::Token(token)
    }
}

/// Line-buffering decoder over raw upstream bytes
#[derive(Debug)]
pub struct EventDecoder {
    /// Bytes of the current, not yet terminated line
    buffer: Vec<u8>,

    state: DecoderState,

    max_line_size: usize,

    /// Event lines skipped because they did not parse
    malformed: usize,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINE_SIZE)
    }

    pub fn with_capacity(max_line_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            state: DecoderState::AwaitingEvent,
            max_line_size,
            malformed: 0,
        }
    }

    /// Feed bytes; returns the tokens completed by this chunk, in order
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        let mut tokens = Vec::new();
        if self.state == DecoderState::Terminated {
            return Ok(tokens);
        }

        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.consume_line(&line[..pos], &mut tokens);
            if self.state == DecoderState::Terminated {
                self.buffer.clear();
                return Ok(tokens);
            }
        }

        if self.buffer.len() > self.max_line_size {
            return Err(DiagError::Streaming(format!(
                "Line overflow: {} bytes exceeds maximum {}",
                self.buffer.len(),
                self.max_line_size
            )));
        }

        Ok(tokens)
    }

    /// Flush a trailing line left without a newline when the stream closed
    pub fn finish(&mut self) -> Vec<String> {
        let mut tokens = Vec::new();
        if self.state != DecoderState::Terminated && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.consume_line(&line, &mut tokens);
        }
        self.state = DecoderState::Terminated;
        tokens
    }

    fn consume_line(&mut self, raw: &[u8], tokens: &mut Vec<String>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches('\r');

        match decode_line(line) {
            LineEvent::Ignored => {}
            LineEvent::Malformed => {
                self.malformed += 1;
                warn!(line = %line, "skipping malformed upstream event");
            }
            LineEvent::Token(token) => {
                self.state = DecoderState::Accumulating;
                tokens.push(token);
            }
            LineEvent::Done => {
                debug!("upstream sent end-of-stream sentinel");
                self.state = DecoderState::Terminated;
            }
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == DecoderState::Terminated
    }

    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_decode_delta_content() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(decode_line(line), LineEvent::Token("Hel".to_string()));
    }

    #[test]
    fn test_decode_text_fallback() {
        let line = r#"data: {"choices":[{"text":"lo"}]}"#;
        assert_eq!(decode_line(line), LineEvent::Token("lo".to_string()));

        let empty_delta = r#"data: {"choices":[{"delta":{"content":""},"text":"x"}]}"#;
        assert_eq!(decode_line(empty_delta), LineEvent::Token("x".to_string()));
    }

    #[test]
    fn test_decode_sentinel_and_noise() {
        assert_eq!(decode_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(decode_line("data:[DONE]"), LineEvent::Done);
        assert_eq!(decode_line(": keep-alive"), LineEvent::Ignored);
        assert_eq!(decode_line("event: message"), LineEvent::Ignored);
        assert_eq!(decode_line("data: {not json"), LineEvent::Malformed);
        assert_eq!(decode_line(r#"data: {"choices":[]}"#), LineEvent::Malformed);
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            LineEvent::Ignored
        );
    }

    #[test]
    fn test_state_transitions() {
        let mut decoder = EventDecoder::new();
        assert_eq!(decoder.state(), DecoderState::AwaitingEvent);

        let tokens = decoder.push(event("Hel").as_bytes()).unwrap();
        assert_eq!(tokens, vec!["Hel"]);
        assert_eq!(decoder.state(), DecoderState::Accumulating);

        decoder.push(b"data: [DONE]\n").unwrap();
        assert!(decoder.is_terminated());

        let after = decoder.push(event("ignored").as_bytes()).unwrap();
        assert!(after.is_empty());
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = EventDecoder::new();
        let line = event("Hello");
        let (head, tail) = line.as_bytes().split_at(12);

        assert!(decoder.push(head).unwrap().is_empty());
        assert_eq!(decoder.push(tail).unwrap(), vec!["Hello"]);
        assert_eq!(decoder.buffer_size(), 0);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut decoder = EventDecoder::new();
        let line = event("Привет");
        let bytes = line.as_bytes();
        let split = line.find('П').unwrap() + 1;

        assert!(decoder.push(&bytes[..split]).unwrap().is_empty());
        assert_eq!(decoder.push(&bytes[split..]).unwrap(), vec!["Привет"]);
    }

    #[test]
    fn test_malformed_event_skipped() {
        let mut decoder = EventDecoder::new();
        let input = format!("{}data: {{oops\n{}", event("Hel"), event("lo"));

        let tokens = decoder.push(input.as_bytes()).unwrap();
        assert_eq!(tokens, vec!["Hel", "lo"]);
        assert_eq!(decoder.malformed_count(), 1);
        assert_eq!(decoder.state(), DecoderState::Accumulating);
    }

    #[test]
    fn test_crlf_lines() {
        let mut decoder = EventDecoder::new();
        let tokens = decoder
            .push(b"data: {\"choices\":[{\"text\":\"a\"}]}\r\ndata: [DONE]\r\n")
            .unwrap();
        assert_eq!(tokens, vec!["a"]);
        assert!(decoder.is_terminated());
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut decoder = EventDecoder::new();
        let line = event("tail");
        assert!(decoder.push(line.trim_end().as_bytes()).unwrap().is_empty());
        assert_eq!(decoder.finish(), vec!["tail"]);
        assert!(decoder.is_terminated());
    }

    #[test]
    fn test_line_overflow() {
        let mut decoder = EventDecoder::with_capacity(100);
        let result = decoder.push(&vec![b'a'; 150]);
        assert!(matches!(result, Err(DiagError::Streaming(_))));
    }
}
