//! Live job feeds over WebSocket and SSE.
//!
//! Both transports yield [`StreamMessage`]s in arrival order and end after a
//! terminal message (`final` or a validation error), when the server closes,
//! or after a transport error. Frames that fail to decode are reported as
//! errors without ending the feed. Dropping the stream closes the connection.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use drawkit_core::{SseDecoder, SseFrame, StreamMessage};
use futures::{SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::error::ClientError;

/// Boxed feed of decoded messages.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<StreamMessage, ClientError>> + Send>>;

/// Open a WebSocket feed at `url`, giving up if the TCP, TLS and upgrade
/// handshakes take longer than `timeout`.
pub async fn connect_ws(url: &str, timeout: Duration) -> Result<MessageStream, ClientError> {
    log::debug!("connecting websocket feed {url}");
    let (ws, _response) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
        .await
        .map_err(|_| ClientError::ConnectTimeout(timeout))??;

    let stream = futures::stream::unfold((ws, false), |(mut ws, done)| async move {
        if done {
            return None;
        }
        loop {
            let text = match ws.next().await {
                Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        log::warn!("skipping non-UTF-8 binary frame ({} bytes)", bytes.len());
                        continue;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    log::debug!("websocket feed closed by server: {frame:?}");
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Some((Err(ClientError::from(e)), (ws, true))),
                None => return None,
            };

            return match StreamMessage::from_json(&text) {
                Ok(message) => {
                    let terminal = message.is_terminal();
                    if terminal {
                        if let Err(e) = SinkExt::close(&mut ws).await {
                            log::debug!("closing websocket feed: {e}");
                        }
                    }
                    Some((Ok(message), (ws, terminal)))
                }
                Err(e) => Some((Err(ClientError::from(e)), (ws, false))),
            };
        }
    });
    Ok(Box::pin(stream))
}

struct SseState {
    body: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    decoder: SseDecoder,
    pending: VecDeque<SseFrame>,
    eof: bool,
    done: bool,
}

/// Turn an already-accepted `text/event-stream` response into a feed.
pub fn sse_messages(response: reqwest::Response) -> MessageStream {
    let state = SseState {
        body: Box::pin(response.bytes_stream()),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        eof: false,
        done: false,
    };

    let stream = futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }
            if let Some(frame) = state.pending.pop_front() {
                let item = match StreamMessage::from_sse(&frame) {
                    Ok(message) => {
                        state.done = message.is_terminal();
                        Ok(message)
                    }
                    Err(e) => Err(ClientError::from(e)),
                };
                return Some((item, state));
            }
            if state.eof {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.push(&chunk);
                    state.pending.extend(frames);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(ClientError::from(e)), state));
                }
                None => {
                    state.eof = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    });
    Box::pin(stream)
}
