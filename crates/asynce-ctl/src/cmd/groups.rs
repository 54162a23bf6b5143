//! Group and invite commands.

use std::path::Path;

use anyhow::Result;

use asynce_core::model::GroupId;
use asynce_services::{GroupStore, GroupView};

use super::{read_blob, with_progress, write_blob};

fn print_group(view: &GroupView) {
    let group = &view.group;
    println!("  ┌─ {} ({})", group.name, group.id);
    println!("  │  owner    : {}", group.owner);
    println!("  │  members  : {}", group.members.len());
    match &view.picture {
        Some(picture) => println!("  └─ picture  : {} bytes", picture.len()),
        None => println!("  └─ picture  : unavailable"),
    }
}

pub async fn cmd_groups(store: &GroupStore) -> Result<()> {
    let views = store.get_all_groups().await?;
    if views.is_empty() {
        println!("Not a member of any group.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Groups ({})", views.len());
    println!("═══════════════════════════════════════");
    for view in &views {
        print_group(view);
    }
    Ok(())
}

pub async fn cmd_group(store: &GroupStore, group: GroupId) -> Result<()> {
    match store.get_group(group).await? {
        Some(view) => print_group(&view),
        None => println!("No group with id {group}."),
    }
    Ok(())
}

pub async fn cmd_create_group(store: &GroupStore, name: &str, picture: &Path) -> Result<()> {
    let picture = read_blob(picture)?;
    let group = with_progress(store, store.create_group(name, picture)).await?;
    println!("Created group {name} ({group}).");
    Ok(())
}

pub async fn cmd_fetch_group_picture(store: &GroupStore, group: GroupId, out: &Path) -> Result<()> {
    let picture = store.fetch_group_picture(group).await?;
    write_blob(out, &picture)
}

pub async fn cmd_invite(store: &GroupStore, group: GroupId, username: &str) -> Result<()> {
    store.invite_user(group, username).await?;
    println!("Invited {username} to group {group}.");
    Ok(())
}

pub async fn cmd_invites(store: &GroupStore) -> Result<()> {
    let invites = store.group_invites().await?;
    if invites.is_empty() {
        println!("No pending invites.");
        return Ok(());
    }
    for invite in &invites {
        println!("  {} ({})", invite.group_name, invite.group_id);
    }
    Ok(())
}

pub async fn cmd_respond(store: &GroupStore, group: GroupId, approved: bool) -> Result<()> {
    store.respond_to_invite(group, approved).await?;
    let verb = if approved { "Joined" } else { "Declined" };
    println!("{verb} group {group}.");
    Ok(())
}
