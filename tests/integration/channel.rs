use crate::*;

use asynce_core::event::{InboundEvent, OutboundCommand};
use asynce_core::model::{ChatId, ChatRef};
use asynce_services::memory::{MemoryConnector, MemorySocket};
use asynce_services::{ChannelState, RealtimeChannel, Session, SessionContext, StoreUpdate};
use tokio::sync::mpsc::UnboundedReceiver;

fn chat(group: GroupId, id: u64, content: &str) -> Chat {
    Chat {
        id: ChatId(id),
        content: content.to_string(),
        group_id: group,
        username: "bob".into(),
        created_time_unix: CREATED + id,
    }
}

fn context(principal: &str) -> SessionContext {
    SessionContext {
        principal: principal.into(),
        token: "token".into(),
        backend_url: "http://127.0.0.1:4943".into(),
        gateway_url: "ws://127.0.0.1:8080".into(),
    }
}

/// Connect `channel` and hand back the far end of its socket.
async fn open(
    channel: &RealtimeChannel,
    sockets: &mut UnboundedReceiver<MemorySocket>,
) -> anyhow::Result<MemorySocket> {
    let connecting = tokio::spawn({
        let channel = channel.clone();
        async move { channel.connect().await }
    });
    let socket = sockets.recv().await.expect("connector handed out a socket");
    socket.open();
    connecting.await??;
    Ok(socket)
}

/// Realtime events reach the store in the order the gateway sent them.
#[tokio::test]
async fn test_events_apply_in_arrival_order() -> anyhow::Result<()> {
    let (store, backend, group) = registered_with_group(4).await?;
    backend.post_chat(chat(group, 1, "history"));
    store.get_chats(group).await?;

    let (connector, mut sockets) = MemoryConnector::new();
    let channel = RealtimeChannel::new(Arc::new(connector));
    store.attach_channel(&channel);
    let mut updates = store.subscribe();
    let socket = open(&channel, &mut sockets).await?;

    socket.push(&InboundEvent::ChatAdded(chat(group, 2, "hi")));
    socket.push(&InboundEvent::ChatEdited(chat(group, 1, "history, edited")));
    socket.push(&InboundEvent::Ping);
    socket.push(&InboundEvent::GroupInviteReceived(GroupInvite {
        group_id: GroupId(77),
        group_name: "book club".into(),
    }));
    socket.push(&InboundEvent::ChatDeleted(ChatRef {
        group_id: group,
        chat_id: ChatId(2),
    }));
    socket.close();

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(match updates.recv().await? {
            StoreUpdate::ChatsChanged(g) => format!("chats {g}"),
            StoreUpdate::InviteReceived(invite) => format!("invite {}", invite.group_id),
            other => panic!("unexpected update {other:?}"),
        });
    }
    assert_eq!(
        seen,
        vec![
            format!("chats {group}"),
            format!("chats {group}"),
            "invite 77".to_string(),
            format!("chats {group}"),
        ]
    );

    let chats = store.chats().get(group);
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].content, "history, edited");
    assert_eq!(store.pending_invites()[0].group_name, "book club");

    channel
        .subscribe_state()
        .wait_for(|s| *s == ChannelState::Closed)
        .await?;
    Ok(())
}

/// Edits and deletions of unknown chats change nothing and publish nothing.
#[tokio::test]
async fn test_unknown_chat_events_are_ignored() -> anyhow::Result<()> {
    let (store, _backend, group) = registered_with_group(4).await?;
    let (connector, mut sockets) = MemoryConnector::new();
    let channel = RealtimeChannel::new(Arc::new(connector));
    store.attach_channel(&channel);
    let mut updates = store.subscribe();
    let socket = open(&channel, &mut sockets).await?;

    socket.push(&InboundEvent::ChatEdited(chat(group, 5, "ghost")));
    socket.push(&InboundEvent::ChatDeleted(ChatRef {
        group_id: group,
        chat_id: ChatId(5),
    }));
    socket.push_raw(b"{not json".to_vec());
    socket.push(&InboundEvent::ChatAdded(chat(group, 6, "real")));

    match updates.recv().await? {
        StoreUpdate::ChatsChanged(g) => assert_eq!(g, group),
        other => panic!("unexpected update {other:?}"),
    }
    assert_eq!(store.chats().get(group), vec![chat(group, 6, "real")]);
    channel.close().await;
    Ok(())
}

#[tokio::test]
async fn test_session_sends_commands_over_its_channel() -> anyhow::Result<()> {
    let backend = FakeBackend::new(4);
    let (connector, mut sockets) = MemoryConnector::new();
    let connector = Arc::new(connector);
    let mut session = Session::new(context("alice"), backend.clone());

    let opening = tokio::spawn(async move {
        let opened = session.open_channel(connector).await.map(|_| ());
        (session, opened)
    });
    let mut socket = sockets.recv().await.expect("connector handed out a socket");
    socket.open();
    let (mut session, opened) = opening.await?;
    opened?;

    let channel = session.channel().cloned().expect("channel is open");
    channel
        .send(&OutboundCommand::AddChat(chat(GroupId(1), 0, "hello")))
        .await?;
    let frame = socket.next_outbound().await.expect("frame was sent");
    let value: serde_json::Value = serde_json::from_slice(&frame)?;
    assert_eq!(value["AddChat"]["content"], "hello");

    session.logout().await;
    assert_eq!(channel.state(), ChannelState::Closed);
    assert!(socket.next_outbound().await.is_none());

    // commands after close are dropped
    channel
        .send(&OutboundCommand::DeleteChat(ChatRef {
            group_id: GroupId(1),
            chat_id: ChatId(0),
        }))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_gateway_refusal_leaves_channel_closed() -> anyhow::Result<()> {
    let (connector, mut sockets) = MemoryConnector::new();
    let channel = RealtimeChannel::new(Arc::new(connector));

    let connecting = tokio::spawn({
        let channel = channel.clone();
        async move { channel.connect().await }
    });
    sockets.recv().await.expect("socket").close();
    let err = connecting.await?.unwrap_err();
    assert!(matches!(err, asynce_core::error::Error::Transport(_)));
    assert_eq!(channel.state(), ChannelState::Closed);

    // a closed channel can be reconnected
    let _socket = open(&channel, &mut sockets).await?;
    assert_eq!(channel.state(), ChannelState::Open);
    Ok(())
}
