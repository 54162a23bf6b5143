//! Realtime channel: one socket per session, typed inbound dispatch.
//!
//! Lifecycle: `Closed → Connecting → Open → Closed`. A transport error, a
//! socket close or [`RealtimeChannel::close`] before open short-circuits
//! `Connecting → Closed` and rejects [`RealtimeChannel::connect`]. There is
//! no reconnect; callers decide whether to call `connect` again.
//!
//! The socket itself sits behind a [`Connector`], which hands back a pair of
//! queues: outbound frames in, transport events out.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use asynce_core::error::{Error, Result};
use asynce_core::event::{EventTag, InboundEvent, OutboundCommand};
use asynce_core::model::GroupInvite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Connecting,
    Open,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Closed => f.write_str("closed"),
            ChannelState::Connecting => f.write_str("connecting"),
            ChannelState::Open => f.write_str("open"),
        }
    }
}

/// What the socket reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Frame(Vec<u8>),
    Error(String),
    Closed,
}

/// A started socket: send frames on `outbound`, read events from `inbound`.
/// Dropping `outbound` closes the socket.
pub struct Transport {
    pub outbound: mpsc::UnboundedSender<Vec<u8>>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Start opening a socket. Success here only means the attempt started;
    /// the socket is usable once it reports [`TransportEvent::Open`].
    async fn connect(&self) -> Result<Transport>;
}

type Listener = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

struct Shared {
    state: watch::Sender<ChannelState>,
    listeners: DashMap<EventTag, Listener>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    /// Bumped by every `close`.
    closes: AtomicU64,
}

/// The session's realtime channel. Clones share one socket.
#[derive(Clone)]
pub struct RealtimeChannel {
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
}

impl RealtimeChannel {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(ChannelState::Closed);
        Self {
            connector,
            shared: Arc::new(Shared {
                state,
                listeners: DashMap::new(),
                outbound: Mutex::new(None),
                reader: Mutex::new(None),
                closes: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    /// Open the socket. Resolves once the transport reports open.
    pub async fn connect(&self) -> Result<()> {
        let mut current = ChannelState::Closed;
        let started = self.shared.state.send_if_modified(|state| {
            current = *state;
            if *state == ChannelState::Closed {
                *state = ChannelState::Connecting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(Error::transport(format!("channel is already {current}")));
        }
        let closes = self.shared.closes.load(Ordering::Acquire);

        let Transport {
            outbound,
            mut inbound,
        } = match self.connector.connect().await {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!(error = %e, "channel connect failed");
                self.shared.state.send_replace(ChannelState::Closed);
                return Err(e);
            }
        };

        if self.shared.closes.load(Ordering::Acquire) != closes {
            tracing::info!("channel closed while connecting");
            return Err(Error::transport("closed while connecting"));
        }

        let mut state = self.shared.state.subscribe();
        loop {
            let event = tokio::select! {
                event = inbound.recv() => event,
                _ = closed(&mut state) => {
                    tracing::info!("channel closed while connecting");
                    return Err(Error::transport("closed while connecting"));
                }
            };
            match event {
                Some(TransportEvent::Open) => break,
                Some(TransportEvent::Frame(frame)) => self.shared.dispatch(&frame),
                Some(TransportEvent::Error(message)) => {
                    tracing::warn!(error = %message, "channel failed before open");
                    self.shared.state.send_replace(ChannelState::Closed);
                    return Err(Error::Transport(message));
                }
                Some(TransportEvent::Closed) | None => {
                    tracing::warn!("channel closed before open");
                    self.shared.state.send_replace(ChannelState::Closed);
                    return Err(Error::transport("socket closed before open"));
                }
            }
        }

        // reader slot stays locked until the reader task is stored
        let mut reader_slot = self.shared.reader.lock().await;
        *self.shared.outbound.lock().await = Some(outbound);
        let opened = self.shared.state.send_if_modified(|state| {
            let still_wanted = self.shared.closes.load(Ordering::Acquire) == closes;
            if *state == ChannelState::Connecting && still_wanted {
                *state = ChannelState::Open;
                true
            } else {
                false
            }
        });
        if !opened {
            self.shared.outbound.lock().await.take();
            tracing::info!("channel closed while connecting");
            return Err(Error::transport("closed while connecting"));
        }
        tracing::info!("channel open");

        let shared = self.shared.clone();
        let reader = tokio::spawn(async move {
            while let Some(event) = inbound.recv().await {
                match event {
                    TransportEvent::Frame(frame) => shared.dispatch(&frame),
                    TransportEvent::Open => {}
                    TransportEvent::Error(message) => {
                        tracing::warn!(error = %message, "channel error");
                        break;
                    }
                    TransportEvent::Closed => break,
                }
            }
            shared.outbound.lock().await.take();
            shared.state.send_replace(ChannelState::Closed);
            tracing::info!("channel closed");
        });
        *reader_slot = Some(reader);
        Ok(())
    }

    /// Send a command. A no-op unless the channel is open.
    pub async fn send(&self, command: &OutboundCommand) -> Result<()> {
        if self.state() != ChannelState::Open {
            tracing::debug!(command = command.name(), "channel not open, dropping command");
            return Ok(());
        }
        let frame = command.encode()?;
        let outbound = self.shared.outbound.lock().await;
        match outbound.as_ref() {
            Some(tx) => tx
                .send(frame)
                .map_err(|_| Error::transport("socket outbound side is gone")),
            None => Ok(()),
        }
    }

    /// Tear the socket down. Idempotent. A `connect` still waiting for the
    /// socket to open is rejected.
    pub async fn close(&self) {
        self.shared.closes.fetch_add(1, Ordering::AcqRel);
        self.shared.outbound.lock().await.take();
        if let Some(reader) = self.shared.reader.lock().await.take() {
            reader.abort();
        }
        if self.shared.state.send_replace(ChannelState::Closed) != ChannelState::Closed {
            tracing::info!("channel closed by client");
        }
    }

    // ── Listeners ─────────────────────────────────────────────────────────────

    /// Register the listener for `tag`, replacing any previous one.
    /// `Ping` and `Unknown` never reach a listener.
    pub fn on<F>(&self, tag: EventTag, listener: F)
    where
        F: Fn(&InboundEvent) + Send + Sync + 'static,
    {
        if !tag.is_domain() {
            tracing::debug!(?tag, "ignoring listener for non-domain event");
            return;
        }
        self.shared.listeners.insert(tag, Arc::new(listener));
    }

    pub fn on_group_invited<F>(&self, listener: F)
    where
        F: Fn(GroupInvite) + Send + Sync + 'static,
    {
        self.on(EventTag::GroupInviteReceived, move |event| {
            if let InboundEvent::GroupInviteReceived(invite) = event {
                listener(invite.clone());
            }
        });
    }
}

async fn closed(state: &mut watch::Receiver<ChannelState>) {
    let _ = state.wait_for(|s| *s == ChannelState::Closed).await;
}

impl Shared {
    fn dispatch(&self, frame: &[u8]) {
        let event = match InboundEvent::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, bytes = frame.len(), "skipping undecodable frame");
                return;
            }
        };
        match &event {
            InboundEvent::Ping => tracing::trace!("ping"),
            InboundEvent::Unknown(tag) => tracing::debug!(tag = %tag, "unknown event"),
            _ => {
                // clone out so a listener may re-register without deadlocking
                let listener = self
                    .listeners
                    .get(&event.tag())
                    .map(|entry| entry.value().clone());
                match listener {
                    Some(listener) => listener(&event),
                    None => tracing::debug!(tag = ?event.tag(), "no listener"),
                }
            }
        }
    }
}
