//! Incremental parser for OpenAI-style server-sent events.
//!
//! Bytes arrive in arbitrary slices; only complete lines are interpreted.
//! `data: [DONE]` ends the stream, `data: {json}` carries a content delta,
//! everything else (comments, blank lines, unparseable chunks) is skipped.

use serde::Deserialize;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A piece of the reply text
    Delta(String),
    /// The server signalled the end of the stream
    Done,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning the events completed by them.
    ///
    /// Bytes are decoded one complete line at a time, so a multi-byte
    /// character split across slices survives intact.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let Some(line) = Self::decode(&raw) else {
                continue;
            };
            if let Some(event) = Self::parse_line(line.trim_end_matches(&['\n', '\r'][..])) {
                let done = event == SseEvent::Done;
                events.push(event);
                if done {
                    self.buffer.clear();
                    break;
                }
            }
        }
        events
    }

    /// Interpret whatever is left once the byte stream has ended.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        Self::parse_line(Self::decode(&rest)?.trim_end_matches('\r'))
    }

    fn decode(raw: &[u8]) -> Option<&str> {
        match std::str::from_utf8(raw) {
            Ok(line) => Some(line),
            Err(e) => {
                trace!(error = %e, "Ignoring SSE line that is not UTF-8");
                None
            }
        }
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        if line.is_empty() || line.starts_with(':') {
            return None;
        }
        let data = line.strip_prefix("data:")?.trim();
        if data == "[DONE]" {
            return Some(SseEvent::Done);
        }
        match serde_json::from_str::<StreamResponse>(data) {
            Ok(resp) => resp
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|content| !content.is_empty())
                .map(SseEvent::Delta),
            Err(e) => {
                trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(text: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{text}\"}}}}]}}\n\n")
    }

    #[test]
    fn parse_content_deltas() {
        let mut parser = SseParser::new();
        let events = parser.feed(format!("{}{}", delta("Hel"), delta("lo")).as_bytes());
        assert_eq!(events, vec![SseEvent::Delta("Hel".into()), SseEvent::Delta("lo".into())]);
    }

    #[test]
    fn lines_split_across_chunks() {
        let mut parser = SseParser::new();
        let raw = delta("split");
        let (a, b) = raw.split_at(17);
        assert!(parser.feed(a.as_bytes()).is_empty());
        assert_eq!(parser.feed(b.as_bytes()), vec![SseEvent::Delta("split".into())]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut parser = SseParser::new();
        let raw = delta("café");
        let split = raw.find('é').unwrap() + 1;
        let (a, b) = raw.as_bytes().split_at(split);
        assert!(parser.feed(a).is_empty());
        assert_eq!(parser.feed(b), vec![SseEvent::Delta("café".into())]);
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let mut parser = SseParser::new();
        let mut raw = b"data: \xff\xfe\n".to_vec();
        raw.extend_from_slice(delta("ok").as_bytes());
        assert_eq!(parser.feed(&raw), vec![SseEvent::Delta("ok".into())]);
    }

    #[test]
    fn done_stops_parsing() {
        let mut parser = SseParser::new();
        let raw = format!("{}data: [DONE]\n{}", delta("a"), delta("ignored"));
        assert_eq!(
            parser.feed(raw.as_bytes()),
            vec![SseEvent::Delta("a".into()), SseEvent::Done]
        );
    }

    #[test]
    fn comments_roles_and_garbage_are_skipped() {
        let mut parser = SseParser::new();
        let raw = concat!(
            ": keep-alive\r\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\r\n",
            "data: not json\n",
            "event: ping\n",
        );
        assert!(parser.feed(raw.as_bytes()).is_empty());
    }

    #[test]
    fn trailing_line_without_newline() {
        let mut parser = SseParser::new();
        let raw = delta("tail");
        let trimmed = raw.trim_end();
        assert!(parser.feed(trimmed.as_bytes()).is_empty());
        assert_eq!(parser.finish(), Some(SseEvent::Delta("tail".into())));
    }
}
