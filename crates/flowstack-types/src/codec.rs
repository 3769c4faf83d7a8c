//! Newline-delimited JSON transport for [`StreamEvent`]s.
//!
//! Emit side: one complete JSON object per line, single `\n` terminator.
//! Receive side: [`NdjsonDecoder`] reassembles the original event sequence
//! from an arbitrarily fragmented byte stream. Chunks may split a record at
//! any byte offset, including inside a multi-byte UTF-8 sequence, or bundle
//! several records together.

use std::collections::VecDeque;

use crate::events::StreamEvent;

/// Serialize an event as one NDJSON record, newline included.
///
/// serde_json escapes embedded newlines, so the record is guaranteed to
/// occupy exactly one line.
pub fn encode_event(event: &StreamEvent) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    Ok(line)
}

/// Incremental decoder for a stream of NDJSON records.
///
/// Feed chunks with [`push`](Self::push) as they arrive; call
/// [`finish`](Self::finish) at end of stream to recover a complete trailing
/// record that was not newline-terminated. A truncated trailing record is
/// discarded silently: `done` is the true terminator of a healthy stream.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: VecDeque<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete record it unlocks, in order.
    ///
    /// Empty lines and malformed records are skipped; a bad record never
    /// aborts the stream.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend(chunk);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(event) = parse_record(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Consume the decoder at end of stream.
    ///
    /// Returns the trailing record if the remainder parses as a complete
    /// event; a partial or malformed remainder yields `None`.
    pub fn finish(self) -> Option<StreamEvent> {
        let remainder: Vec<u8> = self.buffer.into_iter().collect();
        parse_record(&remainder)
    }

    /// Bytes currently held back as a partial record.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_record(bytes: &[u8]) -> Option<StreamEvent> {
    let line = match std::str::from_utf8(bytes) {
        Ok(s) => s.trim(),
        Err(e) => {
            tracing::debug!("skipping non-UTF-8 record: {}", e);
            return None;
        }
    };
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!("skipping malformed record: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_events() -> Vec<StreamEvent> {
        vec![
            StreamEvent::status("Path: query → llm → output"),
            StreamEvent::token("X"),
            StreamEvent::token(" is"),
            StreamEvent::token(" a widget."),
            StreamEvent::output("X is a widget."),
            StreamEvent::done("Execution finished"),
        ]
    }

    fn encode_all(events: &[StreamEvent]) -> Vec<u8> {
        events
            .iter()
            .map(|e| encode_event(e).unwrap())
            .collect::<String>()
            .into_bytes()
    }

    #[test]
    fn encoded_record_is_one_line() {
        let line = encode_event(&StreamEvent::token("a\nb")).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn whole_stream_in_one_chunk() {
        let events = sample_events();
        let mut decoder = NdjsonDecoder::new();
        let decoded = decoder.push(&encode_all(&events));
        assert_eq!(decoded, events);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn round_trip_split_at_every_byte_offset() {
        // The status event carries a multi-byte arrow so splits can land
        // inside a UTF-8 sequence.
        let events = sample_events();
        let bytes = encode_all(&events);

        for split in 0..=bytes.len() {
            let mut decoder = NdjsonDecoder::new();
            let mut decoded = decoder.push(&bytes[..split]);
            decoded.extend(decoder.push(&bytes[split..]));
            if let Some(tail) = decoder.finish() {
                decoded.push(tail);
            }
            assert_eq!(decoded, events, "split at byte {split}");
        }
    }

    #[test]
    fn round_trip_one_byte_at_a_time() {
        let events = sample_events();
        let bytes = encode_all(&events);

        let mut decoder = NdjsonDecoder::new();
        let mut decoded = Vec::new();
        for byte in bytes {
            decoded.extend(decoder.push(&[byte]));
        }
        assert_eq!(decoded, events);
    }

    #[test]
    fn malformed_line_between_tokens_is_skipped() {
        let stream = b"{\"type\":\"token\",\"message\":\"a\"}\nnot json at all\n{\"type\":\"token\",\"message\":\"b\"}\n";
        let mut decoder = NdjsonDecoder::new();
        let decoded = decoder.push(stream);
        assert_eq!(decoded, vec![StreamEvent::token("a"), StreamEvent::token("b")]);
    }

    #[test]
    fn record_missing_message_is_skipped() {
        let stream = b"{\"type\":\"token\"}\n{\"type\":\"token\",\"message\":\"ok\"}\n";
        let mut decoder = NdjsonDecoder::new();
        assert_eq!(decoder.push(stream), vec![StreamEvent::token("ok")]);
    }

    #[test]
    fn unknown_event_kind_is_skipped() {
        let stream = b"{\"type\":\"heartbeat\",\"message\":\"x\"}\n";
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(stream).is_empty());
    }

    #[test]
    fn empty_lines_are_ignored() {
        let stream = b"\n\n{\"type\":\"done\",\"message\":\"ok\"}\n\n";
        let mut decoder = NdjsonDecoder::new();
        assert_eq!(decoder.push(stream), vec![StreamEvent::done("ok")]);
    }

    #[test]
    fn complete_unterminated_tail_is_recovered() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(b"{\"type\":\"done\",\"message\":\"ok\"}").is_empty());
        assert_eq!(decoder.finish(), Some(StreamEvent::done("ok")));
    }

    #[test]
    fn truncated_tail_is_discarded_silently() {
        let mut decoder = NdjsonDecoder::new();
        assert!(decoder.push(b"{\"type\":\"done\",\"mess").is_empty());
        assert_eq!(decoder.finish(), None);
    }
}
