//! Decoder for the newline-delimited JSON emitted by
//! `--output-format stream-json`.
//!
//! The decoder never fails: lines that are not JSON, not UTF-8, or not one of
//! the two text-bearing shapes are classified as [`StreamEvent::Unparseable`]
//! and left for the caller to ignore.

use crate::types::{StreamEvent, WireEvent, WireRecord};

// ─── Line classification ──────────────────────────────────────────────────

/// Classify a single line of stream-json output.
pub fn parse_line(line: &str) -> StreamEvent {
    let trimmed = line.trim();
    let unparseable = || StreamEvent::Unparseable {
        raw: line.to_owned(),
    };

    let Ok(record) = serde_json::from_str::<WireRecord>(trimmed) else {
        return unparseable();
    };

    match record {
        WireRecord::StreamEvent {
            event: WireEvent::ContentBlockDelta { delta },
        } => match delta.text {
            Some(text) => StreamEvent::PartialDelta { text },
            None => unparseable(),
        },
        WireRecord::Assistant { message } => {
            let texts: Vec<String> = message
                .content
                .into_iter()
                .filter_map(|block| block.text)
                .collect();
            if texts.is_empty() {
                // tool_use-only turn
                unparseable()
            } else {
                StreamEvent::FinalMessage {
                    text: texts.concat(),
                }
            }
        }
        _ => unparseable(),
    }
}

// ─── StreamDecoder ────────────────────────────────────────────────────────

/// Incremental decoder: feed raw stdout chunks, receive events for every
/// complete line. A record split across two chunks is held until its
/// terminating newline arrives.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return the events for every line it completes,
    /// in arrival order. Blank lines produce no event.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            if let Some(event) = decode_line(&self.pending[start..end]) {
                events.push(event);
            }
            start = end + 1;
        }
        self.pending.drain(..start);
        events
    }

    /// Flush a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }

    /// Bytes buffered while waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> Option<StreamEvent> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match std::str::from_utf8(bytes) {
        Ok(line) => Some(parse_line(line)),
        Err(_) => Some(StreamEvent::Unparseable {
            raw: String::from_utf8_lossy(bytes).into_owned(),
        }),
    }
}

// ─── Reconciliation ───────────────────────────────────────────────────────

/// Running text for one streamed invocation.
///
/// Deltas are appended; a final message whose text differs from what has
/// been accumulated replaces it wholesale.
#[derive(Debug, Default, Clone)]
pub struct TextAccumulator {
    text: String,
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Returns the delta text when it should be forwarded
    /// to a chunk callback.
    pub fn apply<'e>(&mut self, event: &'e StreamEvent) -> Option<&'e str> {
        match event {
            StreamEvent::PartialDelta { text } => {
                self.text.push_str(text);
                Some(text)
            }
            StreamEvent::FinalMessage { text } => {
                if self.text != *text {
                    self.text.clone_from(text);
                }
                None
            }
            StreamEvent::Unparseable { .. } => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DELTA_HELLO: &str = r#"{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}}"#;
    const DELTA_WORLD: &str = r#"{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" world"}}}"#;
    const FINAL: &str = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hello world"}]}}"#;

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::PartialDelta { text: text.into() }
    }

    #[test]
    fn push_splits_multiple_records_in_one_chunk() {
        let mut dec = StreamDecoder::new();
        let chunk = format!("{DELTA_HELLO}\n{DELTA_WORLD}\n");
        let events = dec.push(chunk.as_bytes());
        assert_eq!(events, vec![delta("Hello"), delta(" world")]);
        assert_eq!(dec.pending_len(), 0);
    }

    #[test]
    fn push_holds_record_split_across_chunks() {
        let mut dec = StreamDecoder::new();
        let line = format!("{DELTA_HELLO}\n");
        let (a, b) = line.as_bytes().split_at(25);

        assert!(dec.push(a).is_empty());
        assert_eq!(dec.pending_len(), 25);
        assert_eq!(dec.push(b), vec![delta("Hello")]);
    }

    #[test]
    fn push_splits_multibyte_character_across_chunks() {
        let mut dec = StreamDecoder::new();
        let line = r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"text":"café"}}}"#;
        let bytes = format!("{line}\n").into_bytes();
        let cut = line.find('é').unwrap() + 1; // inside the two-byte sequence
        assert!(dec.push(&bytes[..cut]).is_empty());
        assert_eq!(dec.push(&bytes[cut..]), vec![delta("café")]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut dec = StreamDecoder::new();
        assert!(dec.push(FINAL.as_bytes()).is_empty());
        assert_eq!(
            dec.finish(),
            Some(StreamEvent::FinalMessage {
                text: "Hello world".into()
            })
        );
        assert_eq!(dec.finish(), None);
    }

    #[test]
    fn blank_and_crlf_lines_are_tolerated() {
        let mut dec = StreamDecoder::new();
        let chunk = format!("\n  \r\n{DELTA_HELLO}\r\n");
        assert_eq!(dec.push(chunk.as_bytes()), vec![delta("Hello")]);
    }

    #[test]
    fn invalid_utf8_is_unparseable() {
        let mut dec = StreamDecoder::new();
        let events = dec.push(b"\xff\xfe garbage\n");
        assert!(matches!(events.as_slice(), [StreamEvent::Unparseable { .. }]));
    }

    #[test]
    fn non_json_is_unparseable() {
        assert!(matches!(
            parse_line("Loading config..."),
            StreamEvent::Unparseable { .. }
        ));
        assert!(matches!(
            parse_line(r#"{"type":"stream_event","event":"#),
            StreamEvent::Unparseable { .. }
        ));
    }

    #[test]
    fn other_wellformed_shapes_are_unparseable() {
        for line in [
            r#"{"type":"system","subtype":"init","session_id":"s1"}"#,
            r#"{"type":"result","subtype":"success","result":"done"}"#,
            r#"{"type":"stream_event","event":{"type":"message_start"}}"#,
            r#"{"type":"stream_event","event":{"type":"content_block_delta","delta":{"type":"input_json_delta","partial_json":"{"}}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Read","input":{}}]}}"#,
            r#"{"no_type":true}"#,
            r#"[1,2,3]"#,
        ] {
            assert!(
                matches!(parse_line(line), StreamEvent::Unparseable { .. }),
                "expected unparseable: {line}"
            );
        }
    }

    #[test]
    fn final_message_concatenates_text_blocks() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"a"},{"type":"tool_use","id":"t","name":"x","input":{}},{"type":"text","text":"b"}]}}"#;
        assert_eq!(
            parse_line(line),
            StreamEvent::FinalMessage { text: "ab".into() }
        );
    }

    #[test]
    fn accumulator_appends_deltas_and_forwards_them() {
        let mut acc = TextAccumulator::new();
        assert_eq!(acc.apply(&delta("Hel")), Some("Hel"));
        assert_eq!(acc.apply(&delta("lo")), Some("lo"));
        assert_eq!(acc.as_str(), "Hello");
    }

    #[test]
    fn accumulator_final_message_replaces_divergent_text() {
        let mut acc = TextAccumulator::new();
        acc.apply(&delta("partial garbage"));
        let fin = StreamEvent::FinalMessage {
            text: "authoritative".into(),
        };
        assert_eq!(acc.apply(&fin), None);
        assert_eq!(acc.as_str(), "authoritative");
    }

    #[test]
    fn accumulator_final_message_matching_deltas_is_not_duplicated() {
        let mut acc = TextAccumulator::new();
        acc.apply(&delta("Hello"));
        acc.apply(&delta(" world"));
        acc.apply(&StreamEvent::FinalMessage {
            text: "Hello world".into(),
        });
        assert_eq!(acc.into_string(), "Hello world");
    }
}
