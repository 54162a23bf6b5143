//! Session management: the authenticated context and what it owns.
//!
//! A [`Session`] owns the typed actor and at most one realtime channel.
//! Switching identity or logging out closes the channel before anything
//! else is built on the new context.

use std::sync::Arc;

use asynce_core::config::AsynceConfig;
use asynce_core::error::Result;

use crate::channel::{Connector, RealtimeChannel};
use crate::remote::{Actor, RemoteCall};

/// Identity and endpoints handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub principal: String,
    pub token: String,
    pub backend_url: String,
    pub gateway_url: String,
}

impl SessionContext {
    pub fn from_config(config: &AsynceConfig) -> Self {
        Self {
            principal: config.identity.principal.clone(),
            token: config.identity.token.clone(),
            backend_url: config.backend.url.clone(),
            gateway_url: config.backend.gateway_url.clone(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.principal.is_empty() || self.token.is_empty()
    }
}

pub struct Session {
    context: SessionContext,
    actor: Actor,
    channel: Option<RealtimeChannel>,
}

impl Session {
    pub fn new(context: SessionContext, remote: Arc<dyn RemoteCall>) -> Self {
        Self {
            context,
            actor: Actor::new(remote),
            channel: None,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn channel(&self) -> Option<&RealtimeChannel> {
        self.channel.as_ref()
    }

    /// Open the session's channel, closing any previous one first.
    pub async fn open_channel(&mut self, connector: Arc<dyn Connector>) -> Result<RealtimeChannel> {
        self.close_channel().await;
        let channel = RealtimeChannel::new(connector);
        channel.connect().await?;
        self.channel = Some(channel.clone());
        tracing::info!(principal = %self.context.principal, "session channel open");
        Ok(channel)
    }

    pub async fn close_channel(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close().await;
        }
    }

    /// Replace the identity. The old channel is closed first.
    pub async fn switch(&mut self, context: SessionContext, remote: Arc<dyn RemoteCall>) {
        self.close_channel().await;
        tracing::info!(from = %self.context.principal, to = %context.principal, "session switched");
        self.context = context;
        self.actor = Actor::new(remote);
    }

    pub async fn logout(mut self) {
        self.close_channel().await;
        tracing::info!(principal = %self.context.principal, "logged out");
    }
}
