//! Server-sent-event relay for the chat companion.
//!
//! The gateway's byte stream is scanned into newline-delimited records, each
//! `data:` payload is re-emitted to the browser unchanged, and the incremental
//! `choices[0].delta.content` fragments are stitched into a transcript.

use std::collections::VecDeque;
use std::convert::Infallible;

use axum::response::sse::Event;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

pub const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseRecord {
    Data(String),
    Done,
}

/// Line buffer over a chunked SSE body.
#[derive(Debug, Default)]
pub struct SseScanner {
    buffer: BytesMut,
}

impl SseScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every record completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseRecord> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line = self.buffer.split_to(newline_pos + 1);
            line.truncate(newline_pos);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if let Some(record) = parse_line(&line) {
                records.push(record);
            }
        }
        records
    }

    /// Flush a trailing line that never got its newline.
    pub fn finish(&mut self) -> Option<SseRecord> {
        let rest = self.buffer.split();
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<SseRecord> {
    let line = match std::str::from_utf8(line) {
        Ok(s) => s.trim_end(),
        Err(_) => {
            tracing::warn!("Skipping non UTF-8 SSE line");
            return None;
        }
    };

    if line.trim().is_empty() || line.starts_with(':') {
        return None;
    }

    let data = line.strip_prefix("data:")?.trim();
    if data == DONE_MARKER {
        Some(SseRecord::Done)
    } else if data.is_empty() {
        None
    } else {
        Some(SseRecord::Data(data.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// The assistant message as it grows.
#[derive(Debug, Default)]
pub struct Transcript {
    content: String,
    fragments: usize,
    skipped: usize,
}

impl Transcript {
    /// Append the content fragment carried by one `data:` payload, if any.
    pub fn absorb(&mut self, data: &str) -> Option<&str> {
        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.skipped += 1;
                tracing::warn!(error = %e, "Failed to parse SSE data");
                return None;
            }
        };

        let fragment = chunk.choices.into_iter().next()?.delta.content?;
        if fragment.is_empty() {
            return None;
        }
        let start = self.content.len();
        self.content.push_str(&fragment);
        self.fragments += 1;
        Some(&self.content[start..])
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

struct Relay<S> {
    upstream: S,
    scanner: SseScanner,
    pending: VecDeque<SseRecord>,
    transcript: Transcript,
    upstream_done: bool,
    finished: bool,
    user_id: Uuid,
}

impl<S> Relay<S> {
    fn finish(&mut self, saw_done: bool) {
        self.finished = true;
        tracing::debug!(
            user_id = %self.user_id,
            fragments = self.transcript.fragments(),
            skipped = self.transcript.skipped(),
            chars = self.transcript.content().chars().count(),
            saw_done = saw_done,
            "Chat stream finished"
        );
    }
}

/// Re-emit the gateway's SSE records as axum events, ending after `[DONE]`.
pub fn relay<S>(upstream: S, user_id: Uuid) -> impl Stream<Item = Result<Event, Infallible>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let state = Relay {
        upstream,
        scanner: SseScanner::new(),
        pending: VecDeque::new(),
        transcript: Transcript::default(),
        upstream_done: false,
        finished: false,
        user_id,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if st.finished {
                return None;
            }

            if let Some(record) = st.pending.pop_front() {
                let event = match record {
                    SseRecord::Done => {
                        st.finish(true);
                        Event::default().data(DONE_MARKER)
                    }
                    SseRecord::Data(data) => {
                        st.transcript.absorb(&data);
                        Event::default().data(data)
                    }
                };
                return Some((Ok(event), st));
            }

            if st.upstream_done {
                st.finish(false);
                return None;
            }

            match st.upstream.next().await {
                Some(Ok(chunk)) => {
                    let records = st.scanner.push(&chunk);
                    st.pending.extend(records);
                }
                Some(Err(e)) => {
                    tracing::warn!(user_id = %st.user_id, error = %e, "Chat stream read error");
                    st.upstream_done = true;
                }
                None => {
                    st.upstream_done = true;
                    if let Some(record) = st.scanner.finish() {
                        st.pending.push_back(record);
                    }
                }
            }
        }
    })
}
