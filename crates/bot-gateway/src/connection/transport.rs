//! Socket transport
//!
//! The connection talks to the socket through a pair of channels so the
//! state machine never runs inside the socket library's read loop.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{GatewayError, GatewayResult};

/// Channel buffer size for outgoing frames
const OUTBOUND_BUFFER_SIZE: usize = 100;

/// Frame to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    /// Send a close frame with this code and stop writing
    Close(u16),
}

/// Event read from the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// Socket closed; always the last event of a handle
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

/// Both ends of an open socket
#[derive(Debug)]
pub struct TransportHandle {
    pub outbound: mpsc::Sender<Outbound>,
    pub inbound: mpsc::Receiver<Inbound>,
}

/// Opens gateway sockets
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn open(&self, url: &str) -> GatewayResult<TransportHandle>;
}

/// WebSocket transport over tokio-tungstenite
#[derive(Debug, Default, Clone)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GatewayTransport for WebSocketTransport {
    async fn open(&self, url: &str) -> GatewayResult<TransportHandle> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        tracing::info!(url = %url, "WebSocket opened");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(OUTBOUND_BUFFER_SIZE);
        let (in_tx, in_rx) = mpsc::channel::<Inbound>(OUTBOUND_BUFFER_SIZE);

        // Writer: runs until a close is requested or every sender is gone
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match frame {
                    Outbound::Text(text) => {
                        if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                            tracing::warn!(error = %e, "Failed to write to WebSocket");
                            break;
                        }
                    }
                    Outbound::Close(code) => {
                        let frame = CloseFrame {
                            code: WsCloseCode::from(code),
                            reason: "".into(),
                        };
                        let _ = ws_sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                }
            }
            let _ = ws_sink.close().await;
        });

        // Reader
        tokio::spawn(async move {
            let closed = loop {
                match ws_stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if in_tx.send(Inbound::Text(text.to_string())).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => Inbound::Closed {
                                code: Some(u16::from(frame.code)),
                                reason: frame.reason.to_string(),
                            },
                            None => Inbound::Closed {
                                code: None,
                                reason: String::new(),
                            },
                        };
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!("Binary frames not supported, ignoring");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = in_tx.send(Inbound::Error(e.to_string())).await;
                        break Inbound::Closed {
                            code: None,
                            reason: e.to_string(),
                        };
                    }
                    None => {
                        break Inbound::Closed {
                            code: None,
                            reason: "stream ended".to_string(),
                        };
                    }
                }
            };
            let _ = in_tx.send(closed).await;
        });

        Ok(TransportHandle {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
