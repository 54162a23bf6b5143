//! Remote call surface: the untyped transport seam and the typed actor on top.
//!
//! A [`RemoteCall`] moves `(method, args)` to the backend and returns the raw
//! reply. The [`Actor`] owns the method names and argument order, decodes
//! replies into [`Envelope`]s, and unwraps each one exactly once.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use asynce_core::envelope::{self, Envelope, OptSeq};
use asynce_core::error::{Error, Result};
use asynce_core::model::{
    Chat, Group, GroupId, GroupInvite, MeetingHeader, MeetingId, UserCredentials,
};

/// Backend method names.
pub mod methods {
    pub const REGISTER: &str = "register";
    pub const VALIDATE_USERNAME: &str = "validate_username";
    pub const GET_USER_CREDENTIALS: &str = "get_user_credentials";
    pub const UPLOAD_PROFILE_PICTURE: &str = "upload_profile_picture";
    pub const GET_PROFILE_PICTURE_SIZE: &str = "get_profile_picture_size";
    pub const GET_PROFILE_PICTURE_CHUNK: &str = "get_profile_picture_chunk_blob";

    pub const CREATE_GROUP: &str = "create_group";
    pub const GET_ALL_GROUPS: &str = "get_all_groups";
    pub const GET_GROUP: &str = "get_group";
    pub const UPLOAD_GROUP_PICTURE: &str = "upload_group_profile_picture";
    pub const GET_GROUP_PICTURE_SIZE: &str = "get_group_profile_picture_size";
    pub const GET_GROUP_PICTURE_CHUNK: &str = "get_group_profile_picture_chunk_blob";

    pub const GET_MEETINGS: &str = "get_meetings";
    pub const GET_MEETING_DETAIL: &str = "get_meeting_detail";
    pub const CREATE_MEETING: &str = "create_meeting";
    pub const UPLOAD_VIDEO: &str = "upload_video";
    pub const GET_VIDEO_SIZE: &str = "get_video_meeting_size";
    pub const GET_VIDEO_CHUNK: &str = "get_video_meeting_chunk_blob";
    pub const GET_FRAME_SIZE: &str = "get_video_frame_size";
    pub const GET_FRAME_CHUNK: &str = "get_video_frame_chunk_blob";
    pub const GET_THUMBNAIL_SIZE: &str = "get_meeting_thumbnail_size";
    pub const GET_THUMBNAIL_CHUNK: &str = "get_meeting_thumbnail_chunk_blob";

    pub const GET_CHATS: &str = "get_chats";

    pub const INVITE_USER: &str = "invite_user";
    pub const GET_SELF_GROUP_INVITES: &str = "get_self_group_invites";
    pub const UPDATE_GROUP_INVITE: &str = "update_group_invite";
}

/// Moves one call to the backend.
///
/// `Err` is a transport failure. `Ok(None)` means the call went through but
/// the backend produced no envelope.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Option<Value>>;
}

/// Typed, authenticated view of the backend.
#[derive(Clone)]
pub struct Actor {
    remote: Arc<dyn RemoteCall>,
}

impl Actor {
    pub fn new(remote: Arc<dyn RemoteCall>) -> Self {
        Self { remote }
    }

    /// Issue a call and return its envelope without unwrapping it.
    /// Chunk calls use this so the transfer layer can name the failing index.
    pub async fn call_envelope<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Option<Envelope<T>>> {
        let reply = self.remote.call(method, args).await?;
        reply
            .map(|value| {
                serde_json::from_value::<Envelope<T>>(value)
                    .map_err(|e| Error::invalid(format!("malformed reply to {method}: {e}")))
            })
            .transpose()
    }

    async fn invoke<T: DeserializeOwned>(&self, method: &str, args: Vec<Value>) -> Result<T> {
        let envelope = self.call_envelope(method, args).await?;
        let value = envelope::unwrap(envelope);
        if let Err(e) = &value {
            tracing::debug!(method, error = %e, "remote call failed");
        }
        value
    }

    // ── Users ─────────────────────────────────────────────────────────────────

    pub async fn register(&self, username: &str) -> Result<()> {
        self.invoke(methods::REGISTER, vec![json!(username)]).await
    }

    pub async fn validate_username(&self, username: &str) -> Result<bool> {
        self.invoke(methods::VALIDATE_USERNAME, vec![json!(username)])
            .await
    }

    /// `None` when the principal has no account yet.
    pub async fn user_credentials(&self) -> Result<Option<UserCredentials>> {
        let creds: OptSeq<UserCredentials> =
            self.invoke(methods::GET_USER_CREDENTIALS, vec![]).await?;
        Ok(creds.into())
    }

    // ── Groups ────────────────────────────────────────────────────────────────

    pub async fn create_group(&self, name: &str) -> Result<GroupId> {
        self.invoke(methods::CREATE_GROUP, vec![json!(name)]).await
    }

    pub async fn all_groups(&self) -> Result<Vec<Group>> {
        self.invoke(methods::GET_ALL_GROUPS, vec![]).await
    }

    /// `None` when no group has this id.
    pub async fn group(&self, group: GroupId) -> Result<Option<Group>> {
        let group: OptSeq<Group> = self.invoke(methods::GET_GROUP, vec![json!(group)]).await?;
        Ok(group.into())
    }

    // ── Meetings ──────────────────────────────────────────────────────────────

    pub async fn meetings(&self, group: GroupId) -> Result<Vec<MeetingHeader>> {
        self.invoke(methods::GET_MEETINGS, vec![json!(group)]).await
    }

    pub async fn meeting_detail(&self, group: GroupId, meeting: MeetingId) -> Result<MeetingHeader> {
        self.invoke(methods::GET_MEETING_DETAIL, vec![json!(group), json!(meeting)])
            .await
    }

    pub async fn create_meeting(&self, group: GroupId, title: &str) -> Result<MeetingId> {
        self.invoke(methods::CREATE_MEETING, vec![json!(group), json!(title)])
            .await
    }

    // ── Chats & invites ───────────────────────────────────────────────────────

    pub async fn chats(&self, group: GroupId) -> Result<Vec<Chat>> {
        self.invoke(methods::GET_CHATS, vec![json!(group)]).await
    }

    pub async fn invite_user(&self, group: GroupId, username: &str) -> Result<()> {
        self.invoke(methods::INVITE_USER, vec![json!(group), json!(username)])
            .await
    }

    pub async fn group_invites(&self) -> Result<Vec<GroupInvite>> {
        self.invoke(methods::GET_SELF_GROUP_INVITES, vec![]).await
    }

    pub async fn update_group_invite(&self, group: GroupId, approved: bool) -> Result<()> {
        self.invoke(methods::UPDATE_GROUP_INVITE, vec![json!(group), json!(approved)])
            .await
    }
}
