//! Chat and realtime commands.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use asynce_core::event::OutboundCommand;
use asynce_core::model::{Chat, ChatId, GroupId};
use asynce_services::{GroupStore, RealtimeChannel, Session, StoreUpdate, WsConnector};

pub async fn cmd_chats(store: &GroupStore, group: GroupId) -> Result<()> {
    let chats = store.get_chats(group).await?;
    if chats.is_empty() {
        println!("No chats in group {group}.");
        return Ok(());
    }
    for chat in &chats {
        println!("  [{}] {}: {}", chat.created_time_unix, chat.username, chat.content);
    }
    Ok(())
}

async fn open_channel(session: &mut Session) -> Result<RealtimeChannel> {
    let connector = Arc::new(WsConnector::new(session.context()));
    session
        .open_channel(connector)
        .await
        .with_context(|| format!("failed to open realtime channel at {}", session.context().gateway_url))
}

pub async fn cmd_send(session: &mut Session, group: GroupId, username: &str, text: &str) -> Result<()> {
    let channel = open_channel(session).await?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let chat = Chat {
        // assigned by the backend
        id: ChatId(0),
        content: text.to_string(),
        group_id: group,
        username: username.to_string(),
        created_time_unix: now,
    };
    channel.send(&OutboundCommand::AddChat(chat)).await?;
    session.close_channel().await;
    println!("Sent.");
    Ok(())
}

/// Print chat and invite events until the channel closes or Ctrl-C.
pub async fn cmd_listen(session: &mut Session, store: &GroupStore) -> Result<()> {
    let channel = open_channel(session).await?;
    store.attach_channel(&channel);
    let mut updates = store.subscribe();
    let mut state = channel.subscribe_state();
    println!("Listening on {} (Ctrl-C to stop)", session.context().gateway_url);

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(StoreUpdate::ChatsChanged(group)) => {
                    let chats = store.chats().get(group);
                    match chats.last() {
                        Some(chat) => println!("  [{}] {}: {} ({} total)", group, chat.username, chat.content, chats.len()),
                        None => println!("  [{group}] no chats left"),
                    }
                }
                Ok(StoreUpdate::InviteReceived(invite)) => {
                    println!("  invited to {} ({})", invite.group_name, invite.group_id);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "update stream lagged"),
            },
            changed = state.wait_for(|s| *s == asynce_services::ChannelState::Closed) => {
                if changed.is_ok() {
                    println!("Channel closed.");
                }
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.close_channel().await;
    Ok(())
}
