//! In-process transport for the realtime channel.
//!
//! Every `connect` hands the far end of the new socket to whoever holds the
//! socket receiver, which then scripts it: open, push frames, fail, close.

use async_trait::async_trait;
use tokio::sync::mpsc;

use asynce_core::error::{Error, Result};
use asynce_core::event::InboundEvent;

use crate::channel::{Connector, Transport, TransportEvent};

pub struct MemoryConnector {
    sockets: mpsc::UnboundedSender<MemorySocket>,
}

impl MemoryConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemorySocket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sockets: tx }, rx)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Transport> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.sockets
            .send(MemorySocket {
                events: events_tx,
                outbound: outbound_rx,
            })
            .map_err(|_| Error::transport("no peer accepting sockets"))?;
        Ok(Transport {
            outbound: outbound_tx,
            inbound: events_rx,
        })
    }
}

/// Far end of one in-process socket.
pub struct MemorySocket {
    events: mpsc::UnboundedSender<TransportEvent>,
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemorySocket {
    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("memory socket: channel side gone");
        }
    }

    pub fn open(&self) {
        self.emit(TransportEvent::Open);
    }

    pub fn push(&self, event: &InboundEvent) {
        match event.encode() {
            Ok(frame) => self.emit(TransportEvent::Frame(frame)),
            Err(e) => tracing::warn!(error = %e, "memory socket: cannot encode event"),
        }
    }

    pub fn push_raw(&self, frame: Vec<u8>) {
        self.emit(TransportEvent::Frame(frame));
    }

    pub fn fail(&self, message: &str) {
        self.emit(TransportEvent::Error(message.to_string()));
    }

    pub fn close(&self) {
        self.emit(TransportEvent::Closed);
    }

    /// Next frame the client sent. `None` once the client dropped its side.
    pub async fn next_outbound(&mut self) -> Option<Vec<u8>> {
        self.outbound.recv().await
    }
}
