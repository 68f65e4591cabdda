//! Event stream transport.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};

use tavern_core::types::SessionId;

use crate::error::ClientError;
use crate::rest::SessionClient;
use crate::sse::SseDecoder;

/// Decoded `data` payloads of one open stream.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// Opens event streams. The subscriber only depends on this trait.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    /// Open a stream for `session_id`. An `Err` counts as a failed attempt.
    async fn open(&self, session_id: SessionId) -> Result<FrameStream, ClientError>;
}

/// SSE over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: SessionClient,
}

impl HttpTransport {
    pub fn new(client: SessionClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn open(&self, session_id: SessionId) -> Result<FrameStream, ClientError> {
        let response = self.client.open_events(session_id).await?;
        let bytes = Box::pin(response.bytes_stream());

        let frames = stream::unfold(
            (bytes, SseDecoder::new(), VecDeque::new()),
            |(mut bytes, mut decoder, mut pending)| async move {
                loop {
                    if let Some(frame) = pending.pop_front() {
                        return Some((Ok(frame), (bytes, decoder, pending)));
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => pending.extend(decoder.push(&chunk)),
                        Some(Err(e)) => {
                            return Some((
                                Err(ClientError::Stream(e.to_string())),
                                (bytes, decoder, pending),
                            ));
                        }
                        None => return None,
                    }
                }
            },
        );
        Ok(Box::pin(frames))
    }
}
