//! asynce-core: domain records, chunk codec, response envelope, realtime
//! frames, and configuration. All other AsyncE crates depend on this one.

pub mod chunk;
pub mod config;
pub mod envelope;
pub mod error;
pub mod event;
pub mod model;

pub use chunk::{TransferDescriptor, CHUNK_SIZE};
pub use envelope::{Envelope, OptSeq};
pub use error::{Error, Result};
pub use event::{EventTag, InboundEvent, OutboundCommand};
pub use model::{
    Chat, ChatId, ChatRef, FailurePolicy, Group, GroupId, GroupInvite, GroupMember,
    GroupMemberRole, MeetingHeader, MeetingId, ResourceKind, ResourceRef, UploadMode,
    UserCredentials,
};
