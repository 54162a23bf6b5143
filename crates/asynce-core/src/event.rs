//! Realtime channel frames.
//!
//! Both directions use externally tagged JSON unions: `{"AddChat": {...}}`.
//! Inbound tags are mapped onto a closed enum so that adding an event is a
//! compile-checked change; tags this client does not know decode to
//! [`InboundEvent::Unknown`] instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Chat, ChatRef, GroupInvite};

/// Wire tags, as the backend spells them.
pub mod tags {
    pub const ADD_CHAT: &str = "AddChat";
    pub const EDIT_CHAT: &str = "EditChat";
    pub const DELETE_CHAT: &str = "DeleteChat";
    pub const GROUP_INVITED: &str = "GroupInvited";
    pub const PING: &str = "Ping";
}

/// An event pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    ChatAdded(Chat),
    ChatEdited(Chat),
    ChatDeleted(ChatRef),
    GroupInviteReceived(GroupInvite),
    Ping,
    /// A tag this client does not understand, kept for logging.
    Unknown(String),
}

/// Discriminant of [`InboundEvent`], used to key listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    ChatAdded,
    ChatEdited,
    ChatDeleted,
    GroupInviteReceived,
    Ping,
    Unknown,
}

impl EventTag {
    /// Tags that carry domain data and may have a listener.
    pub fn is_domain(&self) -> bool {
        !matches!(self, EventTag::Ping | EventTag::Unknown)
    }
}

impl InboundEvent {
    pub fn tag(&self) -> EventTag {
        match self {
            InboundEvent::ChatAdded(_) => EventTag::ChatAdded,
            InboundEvent::ChatEdited(_) => EventTag::ChatEdited,
            InboundEvent::ChatDeleted(_) => EventTag::ChatDeleted,
            InboundEvent::GroupInviteReceived(_) => EventTag::GroupInviteReceived,
            InboundEvent::Ping => EventTag::Ping,
            InboundEvent::Unknown(_) => EventTag::Unknown,
        }
    }

    /// Decode one frame. Unknown tags succeed as `Unknown`; a frame that is
    /// not a tagged union, or a known tag with a bad payload, is an error.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(frame)
            .map_err(|e| Error::invalid(format!("undecodable frame: {e}")))?;

        let (tag, payload) = match value {
            // unit variants may arrive as a bare string
            Value::String(tag) => (tag, Value::Null),
            Value::Object(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => return Err(Error::invalid("frame must carry exactly one tag")),
                }
            }
            _ => return Err(Error::invalid("frame is not a tagged event")),
        };

        let event = match tag.as_str() {
            tags::ADD_CHAT => InboundEvent::ChatAdded(payload_of(&tag, payload)?),
            tags::EDIT_CHAT => InboundEvent::ChatEdited(payload_of(&tag, payload)?),
            tags::DELETE_CHAT => InboundEvent::ChatDeleted(payload_of(&tag, payload)?),
            tags::GROUP_INVITED => InboundEvent::GroupInviteReceived(payload_of(&tag, payload)?),
            tags::PING => InboundEvent::Ping,
            _ => InboundEvent::Unknown(tag),
        };
        Ok(event)
    }

    /// Encode in the backend's wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (tag, payload) = match self {
            InboundEvent::ChatAdded(chat) => (tags::ADD_CHAT, to_value(chat)?),
            InboundEvent::ChatEdited(chat) => (tags::EDIT_CHAT, to_value(chat)?),
            InboundEvent::ChatDeleted(r) => (tags::DELETE_CHAT, to_value(r)?),
            InboundEvent::GroupInviteReceived(invite) => (tags::GROUP_INVITED, to_value(invite)?),
            InboundEvent::Ping => (tags::PING, Value::Null),
            InboundEvent::Unknown(tag) => (tag.as_str(), Value::Null),
        };
        let mut map = serde_json::Map::new();
        map.insert(tag.to_string(), payload);
        serde_json::to_vec(&Value::Object(map)).map_err(|e| Error::invalid(e.to_string()))
    }
}

fn payload_of<T: for<'de> Deserialize<'de>>(tag: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| Error::invalid(format!("bad {tag} payload: {e}")))
}

fn to_value<T: Serialize>(v: &T) -> Result<Value> {
    serde_json::to_value(v).map_err(|e| Error::invalid(e.to_string()))
}

/// A command sent by the client over the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundCommand {
    AddChat(Chat),
    EditChat(Chat),
    DeleteChat(ChatRef),
}

impl OutboundCommand {
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::invalid(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutboundCommand::AddChat(_) => tags::ADD_CHAT,
            OutboundCommand::EditChat(_) => tags::EDIT_CHAT,
            OutboundCommand::DeleteChat(_) => tags::DELETE_CHAT,
        }
    }
}
