use std::collections::VecDeque;
use std::pin::Pin;

use anyhow::Result;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

/// One increment from the generative backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// Out-of-band progress, e.g. a model being pulled before generation
    Status { message: String },

    /// One generated text fragment
    Token { text: String },

    /// Backend signalled normal completion
    Done,
}

/// One NDJSON line of an Ollama `/api/generate` response.
#[derive(Debug, Clone, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// One NDJSON line of an Ollama `/api/pull` response.
#[derive(Debug, Clone, Deserialize)]
struct PullChunk {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse a generate-mode NDJSON byte stream into [`GenerationEvent`]s.
///
/// A backend error payload or a malformed line yields an `Err` item; the
/// caller treats either as a fatal generation failure.
pub fn parse_generate_stream<S, E>(
    stream: S,
) -> Pin<Box<dyn Stream<Item = Result<GenerationEvent>> + Send>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(stream);
        let mut buffer = VecDeque::with_capacity(8192);

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes);

                    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();

                        let Ok(line_str) = std::str::from_utf8(&line_bytes) else {
                            yield Err(anyhow::anyhow!("non-UTF-8 increment from backend"));
                            return;
                        };
                        let line = line_str.trim();
                        if line.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<GenerateChunk>(line) {
                            Ok(chunk) => {
                                if let Some(error) = chunk.error {
                                    yield Err(anyhow::anyhow!("backend error: {}", error));
                                    return;
                                }
                                if let Some(text) = chunk.response {
                                    if !text.is_empty() {
                                        yield Ok(GenerationEvent::Token { text });
                                    }
                                }
                                if chunk.done {
                                    yield Ok(GenerationEvent::Done);
                                    return;
                                }
                            }
                            Err(e) => {
                                yield Err(anyhow::anyhow!("malformed increment: {}", e));
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("stream error: {}", e));
                    return;
                }
            }
        }
    })
}

/// Parse a pull-mode NDJSON byte stream into `Status` events.
///
/// Pull progress is advisory, so malformed lines are skipped rather than
/// failing the stream; a backend error payload still fails it.
pub fn parse_pull_stream<S, E>(
    stream: S,
) -> Pin<Box<dyn Stream<Item = Result<GenerationEvent>> + Send>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(stream);
        let mut buffer = VecDeque::with_capacity(4096);

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes);

                    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();

                        let Ok(line_str) = std::str::from_utf8(&line_bytes) else {
                            continue;
                        };
                        let line = line_str.trim();
                        if line.is_empty() {
                            continue;
                        }

                        match serde_json::from_str::<PullChunk>(line) {
                            Ok(chunk) => {
                                if let Some(error) = chunk.error {
                                    yield Err(anyhow::anyhow!("model pull failed: {}", error));
                                    return;
                                }
                                if let Some(status) = chunk.status {
                                    yield Ok(GenerationEvent::Status { message: status });
                                }
                            }
                            Err(e) => {
                                tracing::debug!("skipping malformed pull line: {}", e);
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::anyhow!("stream error: {}", e));
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
        futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c))))
    }

    async fn collect(
        mut stream: Pin<Box<dyn Stream<Item = Result<GenerationEvent>> + Send>>,
    ) -> Vec<Result<GenerationEvent>> {
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn parses_tokens_until_done() {
        let stream = byte_stream(vec![
            b"{\"response\":\"X\",\"done\":false}\n{\"response\":\" is\",\"done\":false}\n",
            b"{\"response\":\" a widget.\",\"done\":false}\n{\"response\":\"\",\"done\":true}\n",
        ]);
        let events = collect(parse_generate_stream(stream)).await;

        let events: Vec<_> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![
                GenerationEvent::Token { text: "X".into() },
                GenerationEvent::Token { text: " is".into() },
                GenerationEvent::Token { text: " a widget.".into() },
                GenerationEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn reassembles_line_split_across_chunks() {
        let stream = byte_stream(vec![
            b"{\"response\":\"He",
            b"llo\",\"done\":false}\n{\"response\":\"\",\"done\":true}\n",
        ]);
        let events = collect(parse_generate_stream(stream)).await;

        assert_eq!(
            events[0].as_ref().unwrap(),
            &GenerationEvent::Token { text: "Hello".into() }
        );
        assert_eq!(events[1].as_ref().unwrap(), &GenerationEvent::Done);
    }

    #[tokio::test]
    async fn backend_error_payload_fails_the_stream() {
        let stream = byte_stream(vec![
            b"{\"response\":\"Hel\",\"done\":false}\n{\"error\":\"model crashed\"}\n{\"response\":\"never\",\"done\":false}\n",
        ]);
        let events = collect(parse_generate_stream(stream)).await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &GenerationEvent::Token { text: "Hel".into() }
        );
        let err = events[1].as_ref().unwrap_err().to_string();
        assert!(err.contains("model crashed"), "got: {err}");
    }

    #[tokio::test]
    async fn malformed_increment_fails_the_stream() {
        let stream = byte_stream(vec![b"{not valid json\n"]);
        let events = collect(parse_generate_stream(stream)).await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_err());
    }

    #[tokio::test]
    async fn parsed_streams_can_move_to_a_spawned_task() {
        // Both parsers promise Send streams; driving them from a spawned
        // task holds the parser to that promise.
        let generate = parse_generate_stream(byte_stream(vec![
            b"{\"response\":\"ok\",\"done\":false}\n{\"response\":\"\",\"done\":true}\n",
        ]));
        let pull = parse_pull_stream(byte_stream(vec![b"{\"status\":\"success\"}\n"]));

        let generate_events = tokio::spawn(collect(generate)).await.unwrap();
        let pull_events = tokio::spawn(collect(pull)).await.unwrap();

        let generate_events: Vec<_> = generate_events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            generate_events,
            vec![
                GenerationEvent::Token { text: "ok".into() },
                GenerationEvent::Done,
            ]
        );
        assert_eq!(
            pull_events.into_iter().next().unwrap().unwrap(),
            GenerationEvent::Status { message: "success".into() }
        );
    }

    #[tokio::test]
    async fn pull_statuses_are_forwarded_and_junk_skipped() {
        let stream = byte_stream(vec![
            b"{\"status\":\"pulling manifest\"}\ngarbage\n{\"status\":\"success\"}\n",
        ]);
        let events = collect(parse_pull_stream(stream)).await;

        let events: Vec<_> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![
                GenerationEvent::Status { message: "pulling manifest".into() },
                GenerationEvent::Status { message: "success".into() },
            ]
        );
    }
}
