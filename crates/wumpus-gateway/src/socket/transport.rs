//! WebSocket transport
//!
//! A [`Connector`] opens a connection and hands back a [`Transport`]: an
//! outbound frame channel and an inbound event channel. The production
//! connector splits a `tokio-tungstenite` stream into a reader task and a
//! writer task bridged by those channels.

use crate::error::GatewayError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::borrow::Cow;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Channel buffer size for outgoing frames
const FRAME_BUFFER_SIZE: usize = 64;

/// Channel buffer size for incoming events
const EVENT_BUFFER_SIZE: usize = 256;

/// Outbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Close the connection; the writer stops after sending it
    Close { code: u16, reason: String },
}

/// Inbound transport event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    /// Connection closed; `None` when no close frame was received
    Closed { code: Option<u16> },
    Error(String),
}

/// Live connection handle
///
/// Dropping it detaches the owner: nothing more is read from `events`, and
/// the writer stops once `sender` is gone.
#[derive(Debug)]
pub struct Transport {
    pub sender: mpsc::Sender<Frame>,
    pub events: mpsc::Receiver<TransportEvent>,
}

impl Transport {
    /// Create a transport and the opposite ends of its channels
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<Frame>, mpsc::Sender<TransportEvent>) {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        (
            Self {
                sender: frame_tx,
                events: event_rx,
            },
            frame_rx,
            event_tx,
        )
    }
}

/// Opens transports
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, url: &str) -> Result<Transport, GatewayError>;
}

/// `tokio-tungstenite` connector
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn open(&self, url: &str) -> Result<Transport, GatewayError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let (mut ws_sink, mut ws_stream) = stream.split();
        let (transport, mut frames, events) = Transport::channel();

        // Reader: WebSocket -> events
        tokio::spawn(async move {
            let closed = loop {
                match ws_stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if events.send(TransportEvent::Message(text)).await.is_err() {
                            // Owner detached
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        tracing::debug!(len = bytes.len(), "Binary frame dropped");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map(|f| u16::from(f.code));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = events.send(TransportEvent::Error(e.to_string())).await;
                        break None;
                    }
                    None => break None,
                }
            };
            let _ = events.send(TransportEvent::Closed { code: closed }).await;
        });

        // Writer: frames -> WebSocket
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let message = match frame {
                    Frame::Text(text) => Message::Text(text),
                    Frame::Close { code, reason } => {
                        let close = CloseFrame {
                            code: WsCloseCode::from(code),
                            reason: Cow::Owned(reason),
                        };
                        let _ = ws_sink.send(Message::Close(Some(close))).await;
                        break;
                    }
                };
                if let Err(e) = ws_sink.send(message).await {
                    tracing::warn!(error = %e, "Failed to write WebSocket frame");
                    break;
                }
            }

            let _ = ws_sink.close().await;
        });

        Ok(transport)
    }
}
