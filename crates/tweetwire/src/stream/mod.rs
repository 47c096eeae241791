//! Streaming API consumption.
//!
//! A streaming response is a long-lived body of newline-delimited JSON with
//! blank keep-alive lines in between. [`LineReader`] splits the body into
//! lines with a per-read timeout, [`classify`] turns each line into a
//! [`StreamEntity`], and a [`StreamProcessor`] handles it, either inline in
//! the read loop ([`process_stream`]) or behind a bounded queue
//! ([`BufferedStreamProcessor`]).

mod buffered;
mod classifier;
mod processor;

use std::{pin::Pin, time::Duration};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::{debug, info};

pub use buffered::*;
pub use classifier::*;
pub use processor::*;

use crate::error::{TwitterError, TwitterResult};

/// Longest line [`LineReader`] accepts by default.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines.
#[derive(Debug, Default)]
struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<String> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=newline).collect();
        Some(decode(&line))
    }

    /// Length of the line being assembled, terminator excluded.
    fn pending_len(&self) -> usize {
        self.buffer
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(self.buffer.len())
    }

    /// Whatever follows the last newline once the body has ended.
    fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(decode(&rest))
    }
}

fn decode(line: &[u8]) -> String {
    match std::str::from_utf8(line) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!(
                valid_up_to = e.valid_up_to(),
                len = line.len(),
                "Stream line is not valid UTF-8, replacing invalid bytes"
            );
            String::from_utf8_lossy(line).trim().to_string()
        }
    }
}

/// Line-oriented reader over a streaming response body.
///
/// Each wait for the next chunk is bounded by `read_timeout`; the stream as a
/// whole has no deadline. Lines are capped at [`MAX_LINE_BYTES`] unless
/// changed with [`with_max_line_length`](Self::with_max_line_length).
/// Dropping the reader releases the connection.
pub struct LineReader<S> {
    body: Pin<Box<S>>,
    splitter: LineSplitter,
    read_timeout: Duration,
    max_line: usize,
    ended: bool,
}

impl<S, E> LineReader<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<TwitterError>,
{
    pub fn new(body: S, read_timeout: Duration) -> Self {
        Self {
            body: Box::pin(body),
            splitter: LineSplitter::default(),
            read_timeout,
            max_line: MAX_LINE_BYTES,
            ended: false,
        }
    }

    #[must_use]
    pub fn with_max_line_length(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Next raw line, keep-alives included. `None` once the body has ended.
    ///
    /// # Errors
    ///
    /// [`TwitterError::ReadTimeout`] if no chunk arrives in time,
    /// [`TwitterError::LineTooLong`] if a line exceeds the cap, or the body's
    /// own error.
    pub async fn next_line(&mut self) -> TwitterResult<Option<String>> {
        loop {
            if self.splitter.pending_len() > self.max_line {
                return Err(TwitterError::LineTooLong(self.max_line));
            }
            if let Some(line) = self.splitter.next_line() {
                return Ok(Some(line));
            }
            if self.ended {
                return Ok(self.splitter.finish());
            }

            match tokio::time::timeout(self.read_timeout, self.body.next()).await {
                Err(_) => return Err(TwitterError::ReadTimeout(self.read_timeout)),
                Ok(Some(Ok(chunk))) => self.splitter.push(&chunk),
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(None) => {
                    debug!("Stream body ended");
                    self.ended = true;
                }
            }
        }
    }

    /// Next classified entity, skipping keep-alives and non-JSON lines.
    ///
    /// # Errors
    ///
    /// Same as [`next_line`](Self::next_line).
    pub async fn next_entity(&mut self) -> TwitterResult<Option<StreamEntity>> {
        while let Some(line) = self.next_line().await? {
            if let Some(entity) = classify(&line) {
                debug!(kind = entity.kind(), "Classified stream entity");
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }
}

impl<S> std::fmt::Debug for LineReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReader")
            .field("buffered", &self.splitter.buffer.len())
            .field("read_timeout", &self.read_timeout)
            .field("max_line", &self.max_line)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

/// Why an inline stream loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// A handler returned `false`
    Stopped,
    /// The server closed the body
    Closed,
}

/// Result of [`process_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOutcome {
    pub end: StreamEnd,
    /// Entities handed to the processor
    pub dispatched: usize,
}

/// Classify and dispatch every line inline.
///
/// Handler latency throttles the socket read directly. The loop ends when a
/// hook returns `false` or the body ends; dropping the future cancels it.
///
/// # Errors
///
/// Read timeouts and transport errors from the body.
pub async fn process_stream<S, E, P>(
    reader: &mut LineReader<S>,
    processor: &mut P,
) -> TwitterResult<StreamOutcome>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<TwitterError>,
    P: StreamProcessor + ?Sized,
{
    let mut dispatched = 0;
    while let Some(entity) = reader.next_entity().await? {
        dispatched += 1;
        if !processor.process_entity(entity).await {
            info!(dispatched, "Stream processor requested stop");
            return Ok(StreamOutcome {
                end: StreamEnd::Stopped,
                dispatched,
            });
        }
    }

    info!(dispatched, "Stream closed by server");
    Ok(StreamOutcome {
        end: StreamEnd::Closed,
        dispatched,
    })
}


#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::test_support::body;
    use super::*;
    use crate::types::Status;

    #[derive(Default)]
    struct Collect {
        ids: Vec<u64>,
        stop_after: Option<usize>,
    }

    #[async_trait]
    impl StreamProcessor for Collect {
        async fn on_status(&mut self, status: Status) -> bool {
            self.ids.push(status.id);
            self.stop_after.is_none_or(|n| self.ids.len() < n)
        }
    }

    fn reader(
        chunks: Vec<&'static str>,
    ) -> LineReader<impl Stream<Item = Result<Bytes, TwitterError>>> {
        LineReader::new(body(chunks), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let mut reader = reader(vec!["{\"id\":1,", "\"text\":\"a\"}\r\n\r\n{\"id\"", ":2}"]);

        assert_eq!(reader.next_line().await.unwrap().unwrap(), r#"{"id":1,"text":"a"}"#);
        assert_eq!(reader.next_line().await.unwrap().unwrap(), "");
        assert_eq!(reader.next_line().await.unwrap().unwrap(), r#"{"id":2}"#);
        assert!(reader.next_line().await.unwrap().is_none());
        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inline_dispatch_skips_keep_alives() {
        let mut reader = reader(vec![
            "\r\n",
            "{\"id\":1,\"text\":\"a\"}\r\n",
            "\r\n\r\n",
            "{\"id\":2,\"text\":\"b\"}\r\n",
        ]);
        let mut collect = Collect::default();

        let outcome = process_stream(&mut reader, &mut collect).await.unwrap();
        assert_eq!(outcome.end, StreamEnd::Closed);
        assert_eq!(outcome.dispatched, 2);
        assert_eq!(collect.ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_inline_stop_leaves_rest_unread() {
        let mut reader = reader(vec![
            "{\"id\":1}\r\n",
            "{\"id\":2}\r\n",
            "{\"id\":3}\r\n",
        ]);
        let mut collect = Collect {
            stop_after: Some(2),
            ..Collect::default()
        };

        let outcome = process_stream(&mut reader, &mut collect).await.unwrap();
        assert_eq!(outcome.end, StreamEnd::Stopped);
        assert_eq!(collect.ids, vec![1, 2]);

        // The third line is still there for whoever reads next.
        assert!(reader.next_entity().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let mut reader = LineReader::new(
            futures_util::stream::pending::<Result<Bytes, TwitterError>>(),
            Duration::from_millis(20),
        );
        let err = reader.next_line().await.unwrap_err();
        assert!(matches!(err, TwitterError::ReadTimeout(_)));
    }

    #[tokio::test]
    async fn test_overlong_line_is_rejected() {
        let mut reader = reader(vec!["{\"id\":1}\n", "0123456789", "0123456789"])
            .with_max_line_length(16);

        assert_eq!(reader.next_line().await.unwrap().unwrap(), r#"{"id":1}"#);
        let err = reader.next_line().await.unwrap_err();
        assert!(matches!(err, TwitterError::LineTooLong(16)));
    }

    #[tokio::test]
    async fn test_overlong_complete_line_is_rejected() {
        let mut reader = reader(vec!["{\"text\":\"far too long for the cap\"}\n"])
            .with_max_line_length(8);

        let err = reader.next_line().await.unwrap_err();
        assert!(matches!(err, TwitterError::LineTooLong(8)));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let chunks = vec![Ok::<_, TwitterError>(Bytes::from_static(
            b"{\"id\":1,\"text\":\"a\xffb\"}\n",
        ))];
        let mut reader =
            LineReader::new(futures_util::stream::iter(chunks), Duration::from_secs(1));

        let line = reader.next_line().await.unwrap().unwrap();
        assert_eq!(line, "{\"id\":1,\"text\":\"a\u{fffd}b\"}");
    }

    #[tokio::test]
    async fn test_body_error_propagates() {
        let chunks = vec![
            Ok(Bytes::from_static(b"{\"id\":1}\n")),
            Err(TwitterError::Configuration("boom".into())),
        ];
        let mut reader = LineReader::new(futures_util::stream::iter(chunks), Duration::from_secs(1));
        let mut collect = Collect::default();

        let err = process_stream(&mut reader, &mut collect).await.unwrap_err();
        assert!(matches!(err, TwitterError::Configuration(_)));
        assert_eq!(collect.ids, vec![1]);
    }
}
