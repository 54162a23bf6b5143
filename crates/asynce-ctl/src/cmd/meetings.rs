//! Meeting and video commands.

use std::path::Path;

use anyhow::{Context, Result};

use asynce_core::model::{GroupId, MeetingId};
use asynce_services::GroupStore;

use super::{read_blob, with_progress, write_blob};

pub async fn cmd_meetings(store: &GroupStore, group: GroupId) -> Result<()> {
    let meetings = store.get_meetings(group).await?;
    if meetings.is_empty() {
        println!("No meetings in group {group}.");
        return Ok(());
    }
    for m in &meetings {
        println!("  ┌─ {} ({})", m.title, m.id);
        println!("  │  by      : {}", m.created_by);
        println!("  └─ frames  : {}", m.frames_count);
    }
    Ok(())
}

pub async fn cmd_create_meeting(store: &GroupStore, group: GroupId, title: &str) -> Result<()> {
    let meeting = store.create_meeting(group, title).await?;
    println!("Created meeting {title} ({meeting}).");
    Ok(())
}

pub async fn cmd_upload_video(
    store: &GroupStore,
    group: GroupId,
    meeting: MeetingId,
    path: &Path,
    title: &str,
) -> Result<()> {
    let video = read_blob(path)?;
    let bytes = video.len();
    with_progress(store, store.upload_video(video, group, meeting, title)).await?;
    println!("Uploaded {bytes} bytes to meeting {meeting}.");
    Ok(())
}

pub async fn cmd_fetch_video(
    store: &GroupStore,
    group: GroupId,
    meeting: MeetingId,
    frame: Option<u64>,
    out: &Path,
) -> Result<()> {
    let video = match frame {
        Some(frame) => store.fetch_video_frame(group, meeting, frame).await?,
        None => store.fetch_meeting_video(group, meeting).await?,
    };
    write_blob(out, &video)
}

pub async fn cmd_thumbnails(store: &GroupStore, group: GroupId, out_dir: Option<&Path>) -> Result<()> {
    let views = store.get_all_thumbnails(group).await?;
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }
    for view in &views {
        match (&view.thumbnail, out_dir) {
            (Some(thumbnail), Some(dir)) => {
                write_blob(&dir.join(format!("{}.jpg", view.meeting.id)), thumbnail)?
            }
            (Some(thumbnail), None) => {
                println!("  {} ({}) : {} bytes", view.meeting.title, view.meeting.id, thumbnail.len())
            }
            (None, _) => println!("  {} ({}) : unavailable", view.meeting.title, view.meeting.id),
        }
    }
    Ok(())
}
