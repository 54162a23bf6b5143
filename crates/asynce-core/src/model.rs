//! Domain records exchanged with the backend.
//!
//! Identifiers arrive as strings (routes, CLI arguments) or numbers (remote
//! replies); both are parsed into typed ids before they reach a remote call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::envelope::opt_seq;
use crate::error::Error;

// ── Identifiers ───────────────────────────────────────────────────────────────

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(Error::invalid(concat!("missing ", $label)));
                }
                trimmed
                    .parse::<u64>()
                    .map($name)
                    .map_err(|_| Error::invalid(format!(concat!("malformed ", $label, ": {:?}"), s)))
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                $name(v)
            }
        }
    };
}

numeric_id!(
    /// Backend primary key of a group.
    GroupId,
    "group id"
);
numeric_id!(
    /// Backend primary key of a meeting, unique within its group.
    MeetingId,
    "meeting id"
);
numeric_id!(ChatId, "chat id");

// ── Resources ─────────────────────────────────────────────────────────────────

/// Whether a resource's chunk commands depend on issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Issue and await strictly in index order. Required when the remote
    /// finalizes on the last-chunk flag or splices chunks as they come.
    Sequential,
    /// Issue every chunk before awaiting any. Order independent.
    Concurrent,
}

/// What a collection fetch does when one item's sub-fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The first failure fails the whole collection.
    FailFast,
    /// Each item settles on its own; failed items are kept without the blob.
    Settle,
}

/// Kinds of blob the backend stores in chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ProfilePicture,
    GroupPicture,
    MeetingVideo,
    VideoFrame,
    MeetingThumbnail,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::ProfilePicture => "profile_picture",
            ResourceKind::GroupPicture => "group_picture",
            ResourceKind::MeetingVideo => "meeting_video",
            ResourceKind::VideoFrame => "video_frame",
            ResourceKind::MeetingThumbnail => "meeting_thumbnail",
        }
    }

    /// Profile pictures and videos are spliced or finalized by the remote
    /// as chunks arrive; group pictures are addressed by index and total.
    pub fn upload_mode(&self) -> UploadMode {
        match self {
            ResourceKind::ProfilePicture | ResourceKind::MeetingVideo => UploadMode::Sequential,
            ResourceKind::GroupPicture => UploadMode::Concurrent,
            // never uploaded by the client; produced by the backend
            ResourceKind::VideoFrame | ResourceKind::MeetingThumbnail => UploadMode::Sequential,
        }
    }

    /// Policy when this kind is fetched as part of a collection.
    pub fn collection_policy(&self) -> FailurePolicy {
        match self {
            ResourceKind::GroupPicture | ResourceKind::MeetingThumbnail => FailurePolicy::Settle,
            ResourceKind::ProfilePicture | ResourceKind::MeetingVideo | ResourceKind::VideoFrame => {
                FailurePolicy::FailFast
            }
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `(resource kind, resource id)`, the only identity a blob has.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ── Chat ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub content: String,
    pub group_id: GroupId,
    pub username: String,
    pub created_time_unix: u64,
}

/// Addresses one chat message; payload of a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRef {
    pub group_id: GroupId,
    pub chat_id: ChatId,
}

// ── Groups & invites ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupMemberRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub role: GroupMemberRole,
    pub username: String,
}

/// Group metadata, without its picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub owner: String,
    pub members: Vec<GroupMember>,
    pub created_time_unix: u64,
}

impl Group {
    pub fn is_member(&self, username: &str) -> bool {
        self.owner.eq_ignore_ascii_case(username)
            || self
                .members
                .iter()
                .any(|m| m.username.eq_ignore_ascii_case(username))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInvite {
    pub group_id: GroupId,
    pub group_name: String,
}

// ── Meetings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingHeader {
    pub id: MeetingId,
    pub title: String,
    pub created_by: String,
    pub frames_count: u64,
    pub created_time_unix: u64,
}

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub username: String,
    pub created_time_unix: u64,
    /// Subscription end, if the user is subscribed.
    #[serde(default, with = "opt_seq")]
    pub subscription_expiry_unix: Option<u64>,
}
