//! Chat store: per-group chat history, seeded from the backend and kept
//! current by realtime chat events.

use dashmap::DashMap;
use std::sync::Arc;

use asynce_core::event::InboundEvent;
use asynce_core::model::{Chat, ChatRef, GroupId};

/// In-memory chat history per group.
#[derive(Clone, Default)]
pub struct ChatStore {
    /// group_id -> chats in arrival order.
    chats: Arc<DashMap<GroupId, Vec<Chat>>>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self {
            chats: Arc::new(DashMap::new()),
        }
    }

    /// Replace a group's history with a freshly fetched one.
    pub fn seed(&self, group: GroupId, chats: Vec<Chat>) {
        self.chats.insert(group, chats);
    }

    /// Append a chat.
    pub fn add(&self, chat: Chat) {
        self.chats.entry(chat.group_id).or_default().push(chat);
    }

    /// Replace a chat's content. Returns false if it is not known.
    pub fn edit(&self, chat: Chat) -> bool {
        let Some(mut chats) = self.chats.get_mut(&chat.group_id) else {
            return false;
        };
        match chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => {
                *existing = chat;
                true
            }
            None => false,
        }
    }

    /// Remove a chat. Returns false if it is not known.
    pub fn delete(&self, target: ChatRef) -> bool {
        let Some(mut chats) = self.chats.get_mut(&target.group_id) else {
            return false;
        };
        let before = chats.len();
        chats.retain(|c| c.id != target.chat_id);
        chats.len() != before
    }

    /// Apply a chat event. Returns the group it touched.
    pub fn apply(&self, event: &InboundEvent) -> Option<GroupId> {
        match event {
            InboundEvent::ChatAdded(chat) => {
                self.add(chat.clone());
                Some(chat.group_id)
            }
            InboundEvent::ChatEdited(chat) => self.edit(chat.clone()).then_some(chat.group_id),
            InboundEvent::ChatDeleted(target) => self.delete(*target).then_some(target.group_id),
            _ => None,
        }
    }

    /// All chats of a group, in arrival order.
    pub fn get(&self, group: GroupId) -> Vec<Chat> {
        self.chats
            .get(&group)
            .map(|chats| chats.clone())
            .unwrap_or_default()
    }

}
