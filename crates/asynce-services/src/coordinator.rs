//! Group store: resource-level operations for the UI layer.
//!
//! Binds the transfer client to concrete resource kinds and keeps the
//! observable state the UI reads: upload progress, the loaded groups and
//! thumbnails, pending invites, and chat history.
//!
//! Every operation that aggregates a blob into a view states its failure
//! policy. Metadata is always required. A blob fetched alongside metadata
//! either fails the whole operation or degrades to `None` with a warning:
//!
//! | operation            | blob              | on blob failure |
//! |----------------------|-------------------|-----------------|
//! | `user_credentials`   | profile picture   | `None`          |
//! | `get_group`          | group picture     | `None`          |
//! | `get_all_groups`     | group picture     | `None`, per group |
//! | `get_all_thumbnails` | meeting thumbnail | `None`, per meeting |
//!
//! Concurrent calls of the same operation are not coalesced; the state maps
//! keep whichever result lands last.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tokio::sync::{broadcast, watch};

use asynce_core::error::Result;
use asynce_core::event::EventTag;
use asynce_core::model::{
    Chat, FailurePolicy, Group, GroupId, GroupInvite, MeetingHeader, MeetingId, ResourceKind,
    UserCredentials,
};

use crate::channel::RealtimeChannel;
use crate::chat_store::ChatStore;
use crate::progress::Progress;
use crate::remote::Actor;
use crate::resource::{
    GroupPicture, MeetingThumbnail, MeetingVideo, ProfilePicture, VideoFrame, VideoUpload,
};
use crate::transfer::{ChunkSource, TransferClient};

const UPDATE_CAPACITY: usize = 256;

/// Group metadata with its picture, if it could be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub group: Group,
    pub picture: Option<Bytes>,
}

/// Meeting metadata with its thumbnail, if it could be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingView {
    pub group_id: GroupId,
    pub meeting: MeetingHeader,
    pub thumbnail: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub credentials: UserCredentials,
    pub picture: Option<Bytes>,
}

/// Pushed to subscribers as state changes.
#[derive(Debug, Clone)]
pub enum StoreUpdate {
    GroupLoaded(GroupView),
    ThumbnailLoaded(MeetingView),
    ChatsChanged(GroupId),
    InviteReceived(GroupInvite),
}

#[derive(Clone)]
pub struct GroupStore {
    actor: Actor,
    transfer: TransferClient,
    chats: ChatStore,
    groups: Arc<DashMap<GroupId, GroupView>>,
    thumbnails: Arc<DashMap<(GroupId, MeetingId), MeetingView>>,
    invites: Arc<DashMap<GroupId, GroupInvite>>,
    progress: Progress,
    updates: broadcast::Sender<StoreUpdate>,
}

impl GroupStore {
    pub fn new(actor: Actor, transfer: TransferClient) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            actor,
            transfer,
            chats: ChatStore::new(),
            groups: Arc::new(DashMap::new()),
            thumbnails: Arc::new(DashMap::new()),
            invites: Arc::new(DashMap::new()),
            progress: Progress::new(),
            updates,
        }
    }

    // ── Observable state ──────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.updates.subscribe()
    }

    /// Fraction of the current upload that has completed.
    pub fn upload_progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    pub fn chats(&self) -> &ChatStore {
        &self.chats
    }

    /// Loaded groups, ordered by id.
    pub fn groups(&self) -> Vec<GroupView> {
        let mut views: Vec<GroupView> = self.groups.iter().map(|e| e.value().clone()).collect();
        views.sort_by_key(|v| v.group.id);
        views
    }

    pub fn group_view(&self, group: GroupId) -> Option<GroupView> {
        self.groups.get(&group).map(|v| v.clone())
    }

    /// Loaded thumbnails of a group, ordered by meeting id.
    pub fn thumbnails(&self, group: GroupId) -> Vec<MeetingView> {
        let mut views: Vec<MeetingView> = self
            .thumbnails
            .iter()
            .filter(|e| e.key().0 == group)
            .map(|e| e.value().clone())
            .collect();
        views.sort_by_key(|v| v.meeting.id);
        views
    }

    pub fn pending_invites(&self) -> Vec<GroupInvite> {
        let mut invites: Vec<GroupInvite> = self.invites.iter().map(|e| e.value().clone()).collect();
        invites.sort_by_key(|i| i.group_id);
        invites
    }

    fn publish(&self, update: StoreUpdate) {
        // no subscribers is fine
        let _ = self.updates.send(update);
    }

    /// Fetch a blob that accompanies metadata. Empty blobs count as absent.
    async fn companion_blob<S>(&self, source: &S, policy: FailurePolicy) -> Result<Option<Bytes>>
    where
        S: ChunkSource,
    {
        match self.transfer.download(source).await {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Ok(Some(data)),
            Err(e) => match policy {
                FailurePolicy::FailFast => Err(e),
                FailurePolicy::Settle => {
                    tracing::warn!(resource = %source.resource(), error = %e, "continuing without blob");
                    Ok(None)
                }
            },
        }
    }

    // ── Users ─────────────────────────────────────────────────────────────────

    /// Create the account, then upload its picture. Any failure fails.
    pub async fn register(&self, username: &str, picture: Bytes) -> Result<()> {
        self.actor.register(username).await?;
        tracing::info!(username, "registered");
        self.upload_profile_picture(picture).await
    }

    pub async fn validate_username(&self, username: &str) -> Result<bool> {
        self.actor.validate_username(username).await
    }

    pub async fn upload_profile_picture(&self, picture: Bytes) -> Result<()> {
        let sink = ProfilePicture::new(self.actor.clone());
        self.transfer.upload_tracked(&sink, picture, &self.progress).await
    }

    pub async fn fetch_profile_picture(&self) -> Result<Bytes> {
        self.transfer
            .download(&ProfilePicture::new(self.actor.clone()))
            .await
    }

    /// `None` when the principal has not registered yet.
    pub async fn user_credentials(&self) -> Result<Option<UserProfile>> {
        let Some(credentials) = self.actor.user_credentials().await? else {
            return Ok(None);
        };
        let source = ProfilePicture::new(self.actor.clone());
        let picture = self.companion_blob(&source, FailurePolicy::Settle).await?;
        Ok(Some(UserProfile {
            credentials,
            picture,
        }))
    }

    // ── Groups ────────────────────────────────────────────────────────────────

    /// Create the group, then upload its picture. Any failure fails.
    pub async fn create_group(&self, name: &str, picture: Bytes) -> Result<GroupId> {
        let group = self.actor.create_group(name).await?;
        tracing::info!(group = %group, name, "group created");
        self.upload_group_picture(group, picture).await?;
        Ok(group)
    }

    pub async fn upload_group_picture(&self, group: GroupId, picture: Bytes) -> Result<()> {
        let sink = GroupPicture::new(self.actor.clone(), group);
        self.transfer.upload_tracked(&sink, picture, &self.progress).await
    }

    pub async fn fetch_group_picture(&self, group: GroupId) -> Result<Bytes> {
        self.transfer
            .download(&GroupPicture::new(self.actor.clone(), group))
            .await
    }

    /// `None` when no group has this id.
    pub async fn get_group(&self, group: GroupId) -> Result<Option<GroupView>> {
        let Some(meta) = self.actor.group(group).await? else {
            return Ok(None);
        };
        let source = GroupPicture::new(self.actor.clone(), group);
        let picture = self.companion_blob(&source, FailurePolicy::Settle).await?;
        let view = GroupView {
            group: meta,
            picture,
        };
        self.groups.insert(group, view.clone());
        self.publish(StoreUpdate::GroupLoaded(view.clone()));
        Ok(Some(view))
    }

    /// Every group the caller belongs to, each with its picture.
    ///
    /// Views are published as their pictures arrive; the returned list keeps
    /// the backend's order. Groups no longer listed are dropped from state.
    pub async fn get_all_groups(&self) -> Result<Vec<GroupView>> {
        let groups = self.actor.all_groups().await?;
        let count = groups.len();
        self.groups
            .retain(|id, _| groups.iter().any(|g| g.id == *id));

        let policy = ResourceKind::GroupPicture.collection_policy();
        let mut loaded = stream::iter(groups.into_iter().enumerate())
            .map(|(pos, group)| async move {
                let source = GroupPicture::new(self.actor.clone(), group.id);
                let picture = self.companion_blob(&source, policy).await;
                (pos, group, picture)
            })
            .buffer_unordered(self.transfer.window(count));

        let mut views: Vec<Option<GroupView>> = (0..count).map(|_| None).collect();
        while let Some((pos, group, picture)) = loaded.next().await {
            let view = GroupView {
                group,
                picture: picture?,
            };
            self.groups.insert(view.group.id, view.clone());
            self.publish(StoreUpdate::GroupLoaded(view.clone()));
            views[pos] = Some(view);
        }
        tracing::debug!(groups = count, "groups loaded");
        Ok(views.into_iter().flatten().collect())
    }

    // ── Meetings ──────────────────────────────────────────────────────────────

    pub async fn create_meeting(&self, group: GroupId, title: &str) -> Result<MeetingId> {
        let meeting = self.actor.create_meeting(group, title).await?;
        tracing::info!(group = %group, meeting = %meeting, title, "meeting created");
        Ok(meeting)
    }

    pub async fn get_meetings(&self, group: GroupId) -> Result<Vec<MeetingHeader>> {
        self.actor.meetings(group).await
    }

    pub async fn meeting_detail(&self, group: GroupId, meeting: MeetingId) -> Result<MeetingHeader> {
        self.actor.meeting_detail(group, meeting).await
    }

    /// Append a recording to a meeting. Progress is observable through
    /// [`GroupStore::upload_progress`].
    pub async fn upload_video(
        &self,
        video: Bytes,
        group: GroupId,
        meeting: MeetingId,
        title: &str,
    ) -> Result<()> {
        let sink = VideoUpload::new(self.actor.clone(), group, meeting, title);
        tracing::debug!(upload_id = %sink.upload_id(), bytes = video.len(), "video upload");
        self.transfer.upload_tracked(&sink, video, &self.progress).await
    }

    pub async fn fetch_meeting_video(&self, group: GroupId, meeting: MeetingId) -> Result<Bytes> {
        self.transfer
            .download(&MeetingVideo::new(self.actor.clone(), group, meeting))
            .await
    }

    pub async fn fetch_video_frame(
        &self,
        group: GroupId,
        meeting: MeetingId,
        frame: u64,
    ) -> Result<Bytes> {
        self.transfer
            .download(&VideoFrame::new(self.actor.clone(), group, meeting, frame))
            .await
    }

    /// Every meeting of a group with its thumbnail.
    ///
    /// The meeting list is required. Each thumbnail settles on its own and
    /// is published as it arrives.
    pub async fn get_all_thumbnails(&self, group: GroupId) -> Result<Vec<MeetingView>> {
        let meetings = self.actor.meetings(group).await?;
        let count = meetings.len();
        self.thumbnails.retain(|(g, _), _| *g != group);

        let policy = ResourceKind::MeetingThumbnail.collection_policy();
        let mut loaded = stream::iter(meetings.into_iter().enumerate())
            .map(|(pos, meeting)| async move {
                let source = MeetingThumbnail::new(self.actor.clone(), group, meeting.id);
                let thumbnail = self.companion_blob(&source, policy).await;
                (pos, meeting, thumbnail)
            })
            .buffer_unordered(self.transfer.window(count));

        let mut views: Vec<Option<MeetingView>> = (0..count).map(|_| None).collect();
        while let Some((pos, meeting, thumbnail)) = loaded.next().await {
            let view = MeetingView {
                group_id: group,
                meeting,
                thumbnail: thumbnail?,
            };
            self.thumbnails
                .insert((group, view.meeting.id), view.clone());
            self.publish(StoreUpdate::ThumbnailLoaded(view.clone()));
            views[pos] = Some(view);
        }
        Ok(views.into_iter().flatten().collect())
    }

    // ── Chats ─────────────────────────────────────────────────────────────────

    /// Fetch a group's history and seed the chat store with it.
    pub async fn get_chats(&self, group: GroupId) -> Result<Vec<Chat>> {
        let chats = self.actor.chats(group).await?;
        self.chats.seed(group, chats.clone());
        self.publish(StoreUpdate::ChatsChanged(group));
        Ok(chats)
    }

    // ── Invites ───────────────────────────────────────────────────────────────

    pub async fn invite_user(&self, group: GroupId, username: &str) -> Result<()> {
        self.actor.invite_user(group, username).await?;
        tracing::info!(group = %group, username, "user invited");
        Ok(())
    }

    /// Fetch the caller's pending invites; replaces the local list.
    pub async fn group_invites(&self) -> Result<Vec<GroupInvite>> {
        let invites = self.actor.group_invites().await?;
        self.invites.clear();
        for invite in &invites {
            self.invites.insert(invite.group_id, invite.clone());
        }
        Ok(invites)
    }

    pub async fn respond_to_invite(&self, group: GroupId, approved: bool) -> Result<()> {
        self.actor.update_group_invite(group, approved).await?;
        self.invites.remove(&group);
        tracing::info!(group = %group, approved, "invite answered");
        Ok(())
    }

    // ── Realtime ──────────────────────────────────────────────────────────────

    /// Route chat and invite events from `channel` into this store.
    pub fn attach_channel(&self, channel: &RealtimeChannel) {
        for tag in [EventTag::ChatAdded, EventTag::ChatEdited, EventTag::ChatDeleted] {
            let (chats, updates) = (self.chats.clone(), self.updates.clone());
            channel.on(tag, move |event| {
                // unknown edits and deletions change nothing
                if let Some(group) = chats.apply(event) {
                    let _ = updates.send(StoreUpdate::ChatsChanged(group));
                }
            });
        }

        let (invites, updates) = (self.invites.clone(), self.updates.clone());
        channel.on_group_invited(move |invite| {
            tracing::info!(group = %invite.group_id, name = %invite.group_name, "invited to group");
            invites.insert(invite.group_id, invite.clone());
            let _ = updates.send(StoreUpdate::InviteReceived(invite));
        });
    }
}
