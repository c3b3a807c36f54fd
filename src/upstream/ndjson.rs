//! Decoder for Ollama's streaming chat body.
//!
//! The backend writes one JSON object per line. Network reads don't respect
//! line boundaries, so bytes are buffered until a full line is available.
//! Decoding is pull-based: nothing is read from the body until the consumer
//! asks for the next chunk.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use super::errors::UpstreamError;
use super::types::ChatChunk;

/// Turn a byte stream into a stream of [`ChatChunk`]s.
///
/// The stream ends after the first error. Blank lines are ignored. A line
/// carrying an `error` field is surfaced as [`UpstreamError::Backend`].
pub fn decode_chunks<S, E>(body: S) -> impl Stream<Item = Result<ChatChunk, UpstreamError>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display,
{
    let body = Box::pin(body);

    stream::unfold(
        (body, BytesMut::new(), false),
        |(mut body, mut buffer, finished)| async move {
            if finished {
                return None;
            }

            loop {
                if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line = buffer.split_to(pos + 1);
                    match parse_line(&line) {
                        Ok(Some(chunk)) => return Some((Ok(chunk), (body, buffer, false))),
                        Ok(None) => continue,
                        Err(e) => return Some((Err(e), (body, buffer, true))),
                    }
                }

                match body.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        return Some((
                            Err(UpstreamError::Stream(format!("read error: {e}"))),
                            (body, buffer, true),
                        ));
                    }
                    None => {
                        // Last line may lack a trailing newline.
                        let line = buffer.split();
                        return match parse_line(&line) {
                            Ok(Some(chunk)) => Some((Ok(chunk), (body, buffer, true))),
                            Ok(None) => None,
                            Err(e) => Some((Err(e), (body, buffer, true))),
                        };
                    }
                }
            }
        },
    )
}

fn parse_line(line: &[u8]) -> Result<Option<ChatChunk>, UpstreamError> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }

    // Invalid UTF-8 inside a string is a decode fault.
    let mut chunk: ChatChunk = serde_json::from_slice(line).map_err(|e| {
        UpstreamError::Decode(format!("{e} (line: {})", String::from_utf8_lossy(line)))
    })?;

    if let Some(error) = chunk.error.take() {
        return Err(UpstreamError::Backend(error));
    }

    Ok(Some(chunk))
}
