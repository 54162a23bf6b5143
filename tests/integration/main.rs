//! AsyncE integration test harness.
//!
//! Tests drive the group store and realtime channel end to end against an
//! in-process backend that keeps real state: accounts, groups, meetings,
//! chunked blobs and invites. Nothing here needs a network.
//!
//!   cargo test --test integration

mod channel;
mod groups;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use asynce_core::error::Result;
use asynce_core::model::{
    Chat, Group, GroupId, GroupInvite, GroupMember, GroupMemberRole, MeetingHeader, MeetingId,
};
use asynce_services::{Actor, GroupStore, RemoteCall, TransferClient};

// ── Fake backend ──────────────────────────────────────────────────────────────

const CREATED: u64 = 1_700_000_000;

/// One recorded call. Byte payloads are recorded as their length.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
}

#[derive(Default)]
struct MeetingState {
    title: String,
    created_by: String,
    frames: Vec<Vec<u8>>,
    thumbnail: Option<Vec<u8>>,
    pending: HashMap<String, BTreeMap<u64, Vec<u8>>>,
}

struct GroupState {
    group: Group,
    picture: Vec<u8>,
    meetings: BTreeMap<u64, MeetingState>,
    chats: Vec<Chat>,
}

#[derive(Default)]
struct State {
    username: Option<String>,
    profile_picture: Vec<u8>,
    groups: BTreeMap<u64, GroupState>,
    invites: Vec<GroupInvite>,
    next_id: u64,
    calls: Vec<Call>,
    failures: HashMap<String, String>,
    chunk_failures: HashMap<(String, u64), String>,
    silent: Vec<String>,
}

type Reply = std::result::Result<Value, String>;

/// Single-principal backend serving blobs in `chunk_size` slices.
pub struct FakeBackend {
    chunk_size: usize,
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new(chunk_size: usize) -> Arc<Self> {
        Arc::new(Self {
            chunk_size,
            state: Mutex::new(State {
                next_id: 1,
                ..State::default()
            }),
        })
    }

    /// Make every call of `method` reply with an error envelope.
    pub fn fail(&self, method: &str, message: &str) {
        let mut state = self.state.lock().unwrap();
        state.failures.insert(method.to_string(), message.to_string());
    }

    /// Make one index of a chunk download method reply with an error envelope.
    pub fn fail_chunk(&self, method: &str, index: u64, message: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .chunk_failures
            .insert((method.to_string(), index), message.to_string());
    }

    /// Make `method` produce no envelope at all.
    pub fn silence(&self, method: &str) {
        self.state.lock().unwrap().silent.push(method.to_string());
    }

    /// A group owned by someone else, which the principal is not in.
    pub fn foreign_group(&self, name: &str, owner: &str) -> GroupId {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        let group = Group {
            id: GroupId(id),
            name: name.to_string(),
            owner: owner.to_string(),
            members: vec![GroupMember {
                role: GroupMemberRole::Admin,
                username: owner.to_string(),
            }],
            created_time_unix: CREATED,
        };
        state.groups.insert(
            id,
            GroupState {
                group,
                picture: Vec::new(),
                meetings: BTreeMap::new(),
                chats: Vec::new(),
            },
        );
        GroupId(id)
    }

    /// Queue an invite for the principal, as another member would.
    pub fn invite_self(&self, group: GroupId) {
        let mut state = self.state.lock().unwrap();
        let name = state
            .groups
            .get(&group.0)
            .map(|g| g.group.name.clone())
            .unwrap_or_default();
        state.invites.push(GroupInvite {
            group_id: group,
            group_name: name,
        });
    }

    pub fn post_chat(&self, chat: Chat) {
        let mut state = self.state.lock().unwrap();
        if let Some(group) = state.groups.get_mut(&chat.group_id.0) {
            group.chats.push(chat);
        }
    }

    pub fn calls(&self, method: &str) -> Vec<Call> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    fn slice(&self, data: &[u8], index: u64) -> Reply {
        let start = index as usize * self.chunk_size;
        if start >= data.len() {
            return Err("Chunk index out of range".into());
        }
        let end = (start + self.chunk_size).min(data.len());
        Ok(json!(&data[start..end]))
    }

    fn write_chunk(&self, target: &mut Vec<u8>, payload: &[u8], index: u64, total: u64) -> Reply {
        if target.len() != total as usize {
            *target = vec![0; total as usize];
        }
        let start = index as usize * self.chunk_size;
        let end = start + payload.len();
        if end > target.len() {
            return Err("Chunk exceeds declared length".into());
        }
        target[start..end].copy_from_slice(payload);
        Ok(Value::Null)
    }

    fn dispatch(&self, state: &mut State, method: &str, args: &[Value]) -> Reply {
        match method {
            "register" => {
                if state.username.is_some() {
                    return Err("User already exists".into());
                }
                state.username = Some(text(args, 0)?);
                Ok(Value::Null)
            }
            "validate_username" => {
                let name = text(args, 0)?;
                let available = !name.is_empty() && state.username.as_deref() != Some(name.as_str());
                Ok(json!(available))
            }
            "get_user_credentials" => Ok(match &state.username {
                Some(name) => json!([{
                    "username": name,
                    "created_time_unix": CREATED,
                    "subscription_expiry_unix": []
                }]),
                None => json!([]),
            }),
            "upload_profile_picture" => {
                let payload = bytes(args, 0)?;
                let mut picture = std::mem::take(&mut state.profile_picture);
                let reply = self.write_chunk(&mut picture, &payload, num(args, 1)?, num(args, 2)?);
                state.profile_picture = picture;
                reply
            }
            "get_profile_picture_size" => Ok(json!(state.profile_picture.len())),
            "get_profile_picture_chunk_blob" => self.slice(&state.profile_picture, num(args, 0)?),

            "create_group" => {
                let owner = state.username.clone().ok_or("Unregistered user")?;
                let id = state.next_id;
                state.next_id += 1;
                let group = Group {
                    id: GroupId(id),
                    name: text(args, 0)?,
                    owner: owner.clone(),
                    members: vec![GroupMember {
                        role: GroupMemberRole::Admin,
                        username: owner,
                    }],
                    created_time_unix: CREATED,
                };
                state.groups.insert(
                    id,
                    GroupState {
                        group,
                        picture: Vec::new(),
                        meetings: BTreeMap::new(),
                        chats: Vec::new(),
                    },
                );
                Ok(json!(id))
            }
            "get_all_groups" => {
                let username = state.username.clone().unwrap_or_default();
                let groups: Vec<&Group> = state
                    .groups
                    .values()
                    .map(|g| &g.group)
                    .filter(|g| g.is_member(&username))
                    .collect();
                Ok(json!(groups))
            }
            "get_group" => Ok(match state.groups.get(&num(args, 0)?) {
                Some(g) => json!([g.group]),
                None => json!([]),
            }),
            "upload_group_profile_picture" => {
                let id = num(args, 0)?;
                let payload = bytes(args, 1)?;
                let (index, total) = (num(args, 2)?, num(args, 3)?);
                let group = state.groups.get_mut(&id).ok_or("Cannot find group with this ID!")?;
                self.write_chunk(&mut group.picture, &payload, index, total)
            }
            "get_group_profile_picture_size" => Ok(json!(group(state, args)?.picture.len())),
            "get_group_profile_picture_chunk_blob" => {
                self.slice(&group(state, args)?.picture, num(args, 1)?)
            }

            "create_meeting" => {
                let id = state.next_id;
                state.next_id += 1;
                let created_by = state.username.clone().unwrap_or_default();
                let title = text(args, 1)?;
                let group = group_mut(state, args)?;
                group.meetings.insert(
                    id,
                    MeetingState {
                        title,
                        created_by,
                        ..MeetingState::default()
                    },
                );
                Ok(json!(id))
            }
            "get_meetings" => {
                let group = group(state, args)?;
                let headers: Vec<MeetingHeader> = group
                    .meetings
                    .iter()
                    .map(|(id, m)| header(*id, m))
                    .collect();
                Ok(json!(headers))
            }
            "get_meeting_detail" => {
                let id = num(args, 1)?;
                Ok(json!(header(id, meeting(state, args)?)))
            }
            "upload_video" => {
                let payload = bytes(args, 2)?;
                let finish = args.get(3).and_then(Value::as_bool).ok_or("bad finish flag")?;
                let title = text(args, 4)?;
                let upload_id = text(args, 5)?;
                let index = num(args, 6)?;
                let group = group_mut(state, args)?;
                let meeting = group
                    .meetings
                    .get_mut(&num(args, 1)?)
                    .ok_or("Cannot find meeting with this ID!")?;
                meeting
                    .pending
                    .entry(upload_id.clone())
                    .or_default()
                    .insert(index, payload);
                if finish {
                    let chunks = meeting.pending.remove(&upload_id).unwrap_or_default();
                    let frame: Vec<u8> = chunks.into_values().flatten().collect();
                    if meeting.thumbnail.is_none() {
                        meeting.thumbnail = Some(frame.iter().take(8).copied().collect());
                    }
                    if !title.is_empty() {
                        meeting.title = title;
                    }
                    meeting.frames.push(frame);
                }
                Ok(Value::Null)
            }
            "get_video_meeting_size" => {
                Ok(json!(meeting(state, args)?.frames.iter().map(Vec::len).sum::<usize>()))
            }
            "get_video_meeting_chunk_blob" => {
                let video: Vec<u8> = meeting(state, args)?.frames.concat();
                self.slice(&video, num(args, 2)?)
            }
            "get_video_frame_size" => Ok(json!(frame(state, args)?.len())),
            "get_video_frame_chunk_blob" => self.slice(frame(state, args)?, num(args, 3)?),
            "get_meeting_thumbnail_size" => {
                let thumbnail = meeting(state, args)?.thumbnail.as_ref().ok_or("No thumbnail")?;
                Ok(json!(thumbnail.len()))
            }
            "get_meeting_thumbnail_chunk_blob" => {
                let thumbnail = meeting(state, args)?.thumbnail.as_ref().ok_or("No thumbnail")?;
                self.slice(thumbnail, num(args, 2)?)
            }

            "get_chats" => Ok(json!(group(state, args)?.chats)),
            "invite_user" => {
                group(state, args)?;
                text(args, 1)?;
                Ok(Value::Null)
            }
            "get_self_group_invites" => Ok(json!(state.invites)),
            "update_group_invite" => {
                let id = GroupId(num(args, 0)?);
                let approved = args.get(1).and_then(Value::as_bool).ok_or("bad approval")?;
                let pos = state
                    .invites
                    .iter()
                    .position(|i| i.group_id == id)
                    .ok_or("No invite for this group")?;
                state.invites.remove(pos);
                if approved {
                    let username = state.username.clone().unwrap_or_default();
                    group_mut(state, args)?.group.members.push(GroupMember {
                        role: GroupMemberRole::Member,
                        username,
                    });
                }
                Ok(Value::Null)
            }
            other => Err(format!("unknown method {other}")),
        }
    }
}

#[async_trait]
impl RemoteCall for FakeBackend {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Option<Value>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            method: method.to_string(),
            args: args.iter().map(summarize).collect(),
        });

        if state.silent.iter().any(|m| m == method) {
            return Ok(None);
        }
        if let Some(message) = state.failures.get(method) {
            return Ok(Some(json!({ "Err": message })));
        }
        let index = args.last().and_then(Value::as_u64).unwrap_or(0);
        if let Some(message) = state.chunk_failures.get(&(method.to_string(), index)) {
            return Ok(Some(json!({ "Err": message })));
        }

        Ok(Some(match self.dispatch(&mut state, method, &args) {
            Ok(value) => json!({ "Ok": value }),
            Err(message) => json!({ "Err": message }),
        }))
    }
}

fn summarize(arg: &Value) -> Value {
    match arg {
        Value::Array(items) => json!(items.len()),
        other => other.clone(),
    }
}

fn num(args: &[Value], pos: usize) -> std::result::Result<u64, String> {
    args.get(pos)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("argument {pos} is not a number"))
}

fn text(args: &[Value], pos: usize) -> std::result::Result<String, String> {
    args.get(pos)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("argument {pos} is not a string"))
}

fn bytes(args: &[Value], pos: usize) -> std::result::Result<Vec<u8>, String> {
    let value = args.get(pos).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| format!("argument {pos} is not a blob: {e}"))
}

fn group<'a>(state: &'a State, args: &[Value]) -> std::result::Result<&'a GroupState, String> {
    state
        .groups
        .get(&num(args, 0)?)
        .ok_or_else(|| "Cannot find group with this ID!".to_string())
}

fn group_mut<'a>(state: &'a mut State, args: &[Value]) -> std::result::Result<&'a mut GroupState, String> {
    state
        .groups
        .get_mut(&num(args, 0)?)
        .ok_or_else(|| "Cannot find group with this ID!".to_string())
}

fn meeting<'a>(state: &'a State, args: &[Value]) -> std::result::Result<&'a MeetingState, String> {
    group(state, args)?
        .meetings
        .get(&num(args, 1)?)
        .ok_or_else(|| "Cannot find meeting with this ID!".to_string())
}

fn frame<'a>(state: &'a State, args: &[Value]) -> std::result::Result<&'a Vec<u8>, String> {
    meeting(state, args)?
        .frames
        .get(num(args, 2)? as usize)
        .ok_or_else(|| "Cannot find frame with this index!".to_string())
}

fn header(id: u64, meeting: &MeetingState) -> MeetingHeader {
    MeetingHeader {
        id: MeetingId(id),
        title: meeting.title.clone(),
        created_by: meeting.created_by.clone(),
        frames_count: meeting.frames.len() as u64,
        created_time_unix: CREATED,
    }
}

// ── Harness ───────────────────────────────────────────────────────────────────

/// A store and the backend it talks to, both on `chunk_size`.
pub fn setup(chunk_size: usize) -> (GroupStore, Arc<FakeBackend>) {
    let backend = FakeBackend::new(chunk_size);
    let transfer = TransferClient::new(chunk_size, 0).expect("nonzero chunk size");
    let store = GroupStore::new(Actor::new(backend.clone()), transfer);
    (store, backend)
}

/// `len` bytes of a repeating non-trivial pattern.
pub fn pattern(len: usize) -> bytes::Bytes {
    (0..len).map(|i| (i * 31 % 251) as u8).collect::<Vec<u8>>().into()
}

/// A registered account with one group.
pub async fn registered_with_group(chunk_size: usize) -> anyhow::Result<(GroupStore, Arc<FakeBackend>, GroupId)> {
    let (store, backend) = setup(chunk_size);
    store.register("alice", pattern(5)).await?;
    let group = store.create_group("standup", pattern(3)).await?;
    Ok((store, backend, group))
}
