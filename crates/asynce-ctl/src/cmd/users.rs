//! Account commands.

use std::path::Path;

use anyhow::Result;

use asynce_services::GroupStore;

use super::{read_blob, with_progress, write_blob};

pub async fn cmd_register(store: &GroupStore, username: &str, picture: &Path) -> Result<()> {
    if !store.validate_username(username).await? {
        anyhow::bail!("username {username:?} is not available");
    }
    let picture = read_blob(picture)?;
    with_progress(store, store.register(username, picture)).await?;
    println!("Registered as {username}.");
    Ok(())
}

pub async fn cmd_whoami(store: &GroupStore) -> Result<()> {
    let Some(profile) = store.user_credentials().await? else {
        println!("Not registered yet.");
        return Ok(());
    };

    println!("═══════════════════════════════════════");
    println!("  {}", profile.credentials.username);
    println!("═══════════════════════════════════════");
    println!("  Created       : {}", profile.credentials.created_time_unix);
    match profile.credentials.subscription_expiry_unix {
        Some(expiry) => println!("  Subscription  : until {expiry}"),
        None => println!("  Subscription  : none"),
    }
    match &profile.picture {
        Some(picture) => println!("  Picture       : {} bytes", picture.len()),
        None => println!("  Picture       : unavailable"),
    }
    Ok(())
}

pub async fn cmd_upload_profile_picture(store: &GroupStore, path: &Path) -> Result<()> {
    let picture = read_blob(path)?;
    let bytes = picture.len();
    with_progress(store, store.upload_profile_picture(picture)).await?;
    println!("Uploaded profile picture ({bytes} bytes).");
    Ok(())
}

pub async fn cmd_fetch_profile_picture(store: &GroupStore, out: &Path) -> Result<()> {
    let picture = store.fetch_profile_picture().await?;
    write_blob(out, &picture)
}
