use std::pin::Pin;

use futures::{Stream, StreamExt};
use glean_core::ChatChunk;
use serde_json::Value;

use crate::error::{GleanError, Result};

/// Lazy, finite sequence of response chunks. `None` marks end-of-stream.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

struct NdjsonDecoder<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    next_index: usize,
    done: bool,
}

impl<S> NdjsonDecoder<S> {
    /// Split the next complete line off the buffer, without its terminator
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    /// Parse one line; blank lines yield nothing
    fn parse(&mut self, line: &[u8]) -> Option<Result<ChatChunk>> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        let index = self.next_index;
        let parsed = serde_json::from_slice::<Value>(line)
            .map(|body| ChatChunk::new(index, body))
            .map_err(|e| GleanError::Decode(format!("stream chunk {}: {}", index, e)));

        match &parsed {
            Ok(_) => {
                tracing::trace!(index, bytes = line.len(), "Decoded chat chunk");
                self.next_index += 1;
            }
            Err(_) => self.fail(),
        }
        Some(parsed)
    }

    fn fail(&mut self) {
        self.done = true;
        self.buffer.clear();
    }
}

/// Decode a newline-delimited JSON body into chat chunks.
///
/// Lines may be split across reads; each chunk is yielded as soon as its
/// newline arrives. A trailing line without a newline is flushed at end of
/// body. The stream ends after the first error.
pub fn decode_ndjson<S, B>(body: S) -> ChatStream
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let decoder = NdjsonDecoder {
        body: Box::pin(body),
        buffer: Vec::new(),
        next_index: 0,
        done: false,
    };

    let stream = futures::stream::unfold(decoder, |mut decoder| async move {
        loop {
            while let Some(line) = decoder.take_line() {
                if let Some(item) = decoder.parse(&line) {
                    return Some((item, decoder));
                }
            }
            if decoder.done {
                return None;
            }

            match decoder.body.next().await {
                Some(Ok(bytes)) => decoder.buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    decoder.fail();
                    return Some((Err(e), decoder));
                }
                None => {
                    decoder.done = true;
                    let rest = std::mem::take(&mut decoder.buffer);
                    tracing::debug!(chunks = decoder.next_index, "Chat stream finished");
                    return decoder.parse(&rest).map(|item| (item, decoder));
                }
            }
        }
    });

    Box::pin(stream.fuse())
}
