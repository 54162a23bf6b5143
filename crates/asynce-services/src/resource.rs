//! Per-kind bindings of the chunk protocol onto backend methods.
//!
//! Each binding supplies the sub-identifiers a kind needs (group, meeting,
//! frame) in the position the backend expects them.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use uuid::Uuid;

use asynce_core::envelope::Envelope;
use asynce_core::model::{GroupId, MeetingId, ResourceKind, ResourceRef};

use crate::chunk_types::OutgoingChunk;
use crate::remote::{methods, Actor};
use crate::transfer::{ChunkSink, ChunkSource, Reply};

async fn size(actor: &Actor, method: &str, args: Vec<Value>) -> Reply<u64> {
    actor.call_envelope(method, args).await
}

async fn chunk_blob(actor: &Actor, method: &str, mut args: Vec<Value>, index: u64) -> Reply<Bytes> {
    args.push(json!(index));
    let reply: Option<Envelope<Vec<u8>>> = actor.call_envelope(method, args).await?;
    Ok(reply.map(|env| env.map(Bytes::from)))
}

// ── Profile picture ───────────────────────────────────────────────────────────

/// The caller's own profile picture.
pub struct ProfilePicture {
    actor: Actor,
}

impl ProfilePicture {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }
}

#[async_trait]
impl ChunkSource for ProfilePicture {
    fn resource(&self) -> ResourceRef {
        ResourceRef::new(ResourceKind::ProfilePicture, "self")
    }

    async fn size(&self) -> Reply<u64> {
        size(&self.actor, methods::GET_PROFILE_PICTURE_SIZE, vec![]).await
    }

    async fn chunk(&self, index: u64) -> Reply<Bytes> {
        chunk_blob(&self.actor, methods::GET_PROFILE_PICTURE_CHUNK, vec![], index).await
    }
}

#[async_trait]
impl ChunkSink for ProfilePicture {
    fn resource(&self) -> ResourceRef {
        ChunkSource::resource(self)
    }

    async fn put_chunk(&self, chunk: OutgoingChunk) -> Reply<()> {
        let args = vec![json!(chunk.payload), json!(chunk.index), json!(chunk.total_length)];
        self.actor
            .call_envelope(methods::UPLOAD_PROFILE_PICTURE, args)
            .await
    }
}

// ── Group picture ─────────────────────────────────────────────────────────────

pub struct GroupPicture {
    actor: Actor,
    group: GroupId,
}

impl GroupPicture {
    pub fn new(actor: Actor, group: GroupId) -> Self {
        Self { actor, group }
    }
}

#[async_trait]
impl ChunkSource for GroupPicture {
    fn resource(&self) -> ResourceRef {
        ResourceRef::new(ResourceKind::GroupPicture, self.group.to_string())
    }

    async fn size(&self) -> Reply<u64> {
        size(&self.actor, methods::GET_GROUP_PICTURE_SIZE, vec![json!(self.group)]).await
    }

    async fn chunk(&self, index: u64) -> Reply<Bytes> {
        chunk_blob(
            &self.actor,
            methods::GET_GROUP_PICTURE_CHUNK,
            vec![json!(self.group)],
            index,
        )
        .await
    }
}

#[async_trait]
impl ChunkSink for GroupPicture {
    fn resource(&self) -> ResourceRef {
        ChunkSource::resource(self)
    }

    async fn put_chunk(&self, chunk: OutgoingChunk) -> Reply<()> {
        let args = vec![
            json!(self.group),
            json!(chunk.payload),
            json!(chunk.index),
            json!(chunk.total_length),
        ];
        self.actor
            .call_envelope(methods::UPLOAD_GROUP_PICTURE, args)
            .await
    }
}

// ── Meeting video ─────────────────────────────────────────────────────────────

/// The concatenated video of a meeting (read side).
pub struct MeetingVideo {
    actor: Actor,
    group: GroupId,
    meeting: MeetingId,
}

impl MeetingVideo {
    pub fn new(actor: Actor, group: GroupId, meeting: MeetingId) -> Self {
        Self {
            actor,
            group,
            meeting,
        }
    }
}

#[async_trait]
impl ChunkSource for MeetingVideo {
    fn resource(&self) -> ResourceRef {
        ResourceRef::new(ResourceKind::MeetingVideo, format!("{}/{}", self.group, self.meeting))
    }

    async fn size(&self) -> Reply<u64> {
        let args = vec![json!(self.group), json!(self.meeting)];
        size(&self.actor, methods::GET_VIDEO_SIZE, args).await
    }

    async fn chunk(&self, index: u64) -> Reply<Bytes> {
        let args = vec![json!(self.group), json!(self.meeting)];
        chunk_blob(&self.actor, methods::GET_VIDEO_CHUNK, args, index).await
    }
}

/// One recording appended to a meeting (write side).
///
/// The remote buffers chunks under `upload_id` and stores the recording as a
/// new frame when it sees `finish`.
pub struct VideoUpload {
    actor: Actor,
    group: GroupId,
    meeting: MeetingId,
    title: String,
    upload_id: Uuid,
}

impl VideoUpload {
    pub fn new(actor: Actor, group: GroupId, meeting: MeetingId, title: impl Into<String>) -> Self {
        Self {
            actor,
            group,
            meeting,
            title: title.into(),
            upload_id: Uuid::new_v4(),
        }
    }

    pub fn upload_id(&self) -> Uuid {
        self.upload_id
    }
}

#[async_trait]
impl ChunkSink for VideoUpload {
    fn resource(&self) -> ResourceRef {
        ResourceRef::new(ResourceKind::MeetingVideo, format!("{}/{}", self.group, self.meeting))
    }

    async fn put_chunk(&self, chunk: OutgoingChunk) -> Reply<()> {
        let args = vec![
            json!(self.group),
            json!(self.meeting),
            json!(chunk.payload),
            json!(chunk.is_last),
            json!(self.title),
            json!(self.upload_id.to_string()),
            json!(chunk.index),
            json!(chunk.total_length),
        ];
        self.actor.call_envelope(methods::UPLOAD_VIDEO, args).await
    }
}

// ── Video frame ───────────────────────────────────────────────────────────────

/// A single recording of a meeting, by position.
pub struct VideoFrame {
    actor: Actor,
    group: GroupId,
    meeting: MeetingId,
    frame: u64,
}

impl VideoFrame {
    pub fn new(actor: Actor, group: GroupId, meeting: MeetingId, frame: u64) -> Self {
        Self {
            actor,
            group,
            meeting,
            frame,
        }
    }

    fn args(&self) -> Vec<Value> {
        vec![json!(self.group), json!(self.meeting), json!(self.frame)]
    }
}

#[async_trait]
impl ChunkSource for VideoFrame {
    fn resource(&self) -> ResourceRef {
        ResourceRef::new(
            ResourceKind::VideoFrame,
            format!("{}/{}/{}", self.group, self.meeting, self.frame),
        )
    }

    async fn size(&self) -> Reply<u64> {
        size(&self.actor, methods::GET_FRAME_SIZE, self.args()).await
    }

    async fn chunk(&self, index: u64) -> Reply<Bytes> {
        chunk_blob(&self.actor, methods::GET_FRAME_CHUNK, self.args(), index).await
    }
}

// ── Meeting thumbnail ─────────────────────────────────────────────────────────

pub struct MeetingThumbnail {
    actor: Actor,
    group: GroupId,
    meeting: MeetingId,
}

impl MeetingThumbnail {
    pub fn new(actor: Actor, group: GroupId, meeting: MeetingId) -> Self {
        Self {
            actor,
            group,
            meeting,
        }
    }
}

#[async_trait]
impl ChunkSource for MeetingThumbnail {
    fn resource(&self) -> ResourceRef {
        ResourceRef::new(
            ResourceKind::MeetingThumbnail,
            format!("{}/{}", self.group, self.meeting),
        )
    }

    async fn size(&self) -> Reply<u64> {
        let args = vec![json!(self.group), json!(self.meeting)];
        size(&self.actor, methods::GET_THUMBNAIL_SIZE, args).await
    }

    async fn chunk(&self, index: u64) -> Reply<Bytes> {
        let args = vec![json!(self.group), json!(self.meeting)];
        chunk_blob(&self.actor, methods::GET_THUMBNAIL_CHUNK, args, index).await
    }
}
