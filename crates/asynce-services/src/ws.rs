//! WebSocket transport for the realtime channel.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;

use asynce_core::error::{Error, Result};

use crate::channel::{Connector, Transport, TransportEvent};
use crate::session::SessionContext;

const PRINCIPAL_HEADER: &str = "x-asynce-principal";

/// Opens the session's socket against the realtime gateway.
pub struct WsConnector {
    url: String,
    principal: String,
    token: String,
}

impl WsConnector {
    pub fn new(context: &SessionContext) -> Self {
        Self {
            url: context.gateway_url.clone(),
            principal: context.principal.clone(),
            token: context.token.clone(),
        }
    }

    fn request(
        &self,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::invalid(format!("bad gateway url {:?}: {e}", self.url)))?;
        let headers = request.headers_mut();
        if !self.token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|e| Error::invalid(format!("bad token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        if !self.principal.is_empty() {
            let value = HeaderValue::from_str(&self.principal)
                .map_err(|e| Error::invalid(format!("bad principal: {e}")))?;
            headers.insert(HeaderName::from_static(PRINCIPAL_HEADER), value);
        }
        Ok(request)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Transport> {
        let request = self.request()?;
        let (events, inbound) = mpsc::unbounded_channel();
        let (outbound, mut frames) = mpsc::unbounded_channel::<Vec<u8>>();
        let url = self.url.clone();

        tokio::spawn(async move {
            let stream = match connect_async(request).await {
                Ok((stream, _response)) => stream,
                Err(e) => {
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    return;
                }
            };
            tracing::debug!(url = %url, "websocket connected");
            let _ = events.send(TransportEvent::Open);

            let (mut write, mut read) = stream.split();
            loop {
                tokio::select! {
                    frame = frames.recv() => match frame {
                        Some(frame) => {
                            let message = match String::from_utf8(frame) {
                                Ok(text) => Message::Text(text),
                                Err(e) => Message::Binary(e.into_bytes()),
                            };
                            if let Err(e) = write.send(message).await {
                                let _ = events.send(TransportEvent::Error(e.to_string()));
                                break;
                            }
                        }
                        None => {
                            let _ = write.close().await;
                            break;
                        }
                    },
                    message = read.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            let _ = events.send(TransportEvent::Frame(text.into_bytes()));
                        }
                        Some(Ok(Message::Binary(data))) => {
                            let _ = events.send(TransportEvent::Frame(data));
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        // ping/pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                    },
                }
            }
            let _ = events.send(TransportEvent::Closed);
            tracing::debug!(url = %url, "websocket closed");
        });

        Ok(Transport { outbound, inbound })
    }
}
