use crate::*;

use asynce_core::error::Error;
use asynce_services::StoreUpdate;

#[tokio::test]
async fn test_register_then_credentials() -> anyhow::Result<()> {
    let (store, _backend) = setup(4);
    assert!(store.user_credentials().await?.is_none(), "no account yet");
    assert!(store.validate_username("alice").await?);

    store.register("alice", pattern(9)).await?;

    assert!(!store.validate_username("alice").await?);
    let profile = store.user_credentials().await?.expect("registered");
    assert_eq!(profile.credentials.username, "alice");
    assert_eq!(profile.credentials.subscription_expiry_unix, None);
    assert_eq!(profile.picture, Some(pattern(9)));
    Ok(())
}

#[tokio::test]
async fn test_register_twice_fails() -> anyhow::Result<()> {
    let (store, backend) = setup(4);
    store.register("alice", pattern(2)).await?;

    let err = store.register("alice", pattern(2)).await.unwrap_err();
    assert_eq!(err, Error::RemoteCallFailed("User already exists".into()));
    // the picture upload never runs after a failed registration
    assert_eq!(backend.calls("upload_profile_picture").len(), 1);
    Ok(())
}

/// A broken profile picture does not hide the account.
#[tokio::test]
async fn test_credentials_settle_on_picture_failure() -> anyhow::Result<()> {
    let (store, backend) = setup(4);
    store.register("alice", pattern(9)).await?;
    backend.fail("get_profile_picture_size", "storage offline");

    let profile = store.user_credentials().await?.expect("registered");
    assert_eq!(profile.credentials.username, "alice");
    assert!(profile.picture.is_none());
    Ok(())
}

#[tokio::test]
async fn test_all_groups_keep_order_and_publish() -> anyhow::Result<()> {
    let (store, _backend) = setup(4);
    store.register("alice", pattern(1)).await?;
    let first = store.create_group("first", pattern(6)).await?;
    let second = store.create_group("second", bytes::Bytes::new()).await?;
    let mut updates = store.subscribe();

    let views = store.get_all_groups().await?;

    let ids: Vec<GroupId> = views.iter().map(|v| v.group.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert_eq!(views[0].picture, Some(pattern(6)));
    assert!(views[1].picture.is_none(), "empty picture counts as absent");

    let mut published = Vec::new();
    for _ in 0..2 {
        match updates.recv().await? {
            StoreUpdate::GroupLoaded(view) => published.push(view.group.id),
            other => panic!("unexpected update {other:?}"),
        }
    }
    published.sort();
    assert_eq!(published, vec![first, second]);
    assert_eq!(store.groups().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_all_groups_settle_picture_failures() -> anyhow::Result<()> {
    let (store, backend, group) = registered_with_group(4).await?;
    backend.fail("get_group_profile_picture_chunk_blob", "storage offline");

    let views = store.get_all_groups().await?;
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].group.id, group);
    assert!(views[0].picture.is_none());
    Ok(())
}

#[tokio::test]
async fn test_all_groups_metadata_failure_fails() -> anyhow::Result<()> {
    let (store, backend, _group) = registered_with_group(4).await?;
    backend.fail("get_all_groups", "This user is not registered!");

    let err = store.get_all_groups().await.unwrap_err();
    assert!(err.is_remote());
    assert!(backend.calls("get_group_profile_picture_size").is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_group_is_none() -> anyhow::Result<()> {
    let (store, _backend, group) = registered_with_group(4).await?;

    assert!(store.get_group(GroupId(999)).await?.is_none());
    let view = store.get_group(group).await?.expect("group exists");
    assert_eq!(view.group.name, "standup");
    assert_eq!(view.picture, Some(pattern(3)));
    assert_eq!(store.group_view(group), Some(view));
    Ok(())
}

/// Meetings without a recording have no thumbnail; the list still loads.
#[tokio::test]
async fn test_thumbnails_settle_per_meeting() -> anyhow::Result<()> {
    let (store, _backend, group) = registered_with_group(4).await?;
    let recorded = store.create_meeting(group, "recorded").await?;
    let empty = store.create_meeting(group, "empty").await?;
    store.upload_video(pattern(20), group, recorded, "").await?;

    let views = store.get_all_thumbnails(group).await?;

    let ids: Vec<MeetingId> = views.iter().map(|v| v.meeting.id).collect();
    assert_eq!(ids, vec![recorded, empty]);
    assert_eq!(views[0].thumbnail.as_deref(), Some(&pattern(20)[..8]));
    assert!(views[1].thumbnail.is_none());
    assert_eq!(store.thumbnails(group).len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_invite_accept_flow() -> anyhow::Result<()> {
    let (store, backend) = setup(4);
    store.register("alice", pattern(1)).await?;
    let foreign = backend.foreign_group("book club", "bob");
    assert!(store.get_all_groups().await?.is_empty());

    backend.invite_self(foreign);
    let invites = store.group_invites().await?;
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].group_name, "book club");
    assert_eq!(store.pending_invites(), invites);

    store.respond_to_invite(foreign, true).await?;

    assert!(store.pending_invites().is_empty());
    assert!(store.group_invites().await?.is_empty());
    let views = store.get_all_groups().await?;
    assert_eq!(views.len(), 1);
    assert!(views[0].group.is_member("alice"));
    Ok(())
}

#[tokio::test]
async fn test_invite_decline_and_missing_invite() -> anyhow::Result<()> {
    let (store, backend) = setup(4);
    store.register("alice", pattern(1)).await?;
    let foreign = backend.foreign_group("book club", "bob");
    backend.invite_self(foreign);

    store.respond_to_invite(foreign, false).await?;
    assert!(store.get_all_groups().await?.is_empty());

    let err = store.respond_to_invite(foreign, true).await.unwrap_err();
    assert_eq!(err, Error::RemoteCallFailed("No invite for this group".into()));
    Ok(())
}

#[tokio::test]
async fn test_invite_user_into_unknown_group() -> anyhow::Result<()> {
    let (store, _backend, group) = registered_with_group(4).await?;
    store.invite_user(group, "bob").await?;

    let err = store.invite_user(GroupId(999), "bob").await.unwrap_err();
    assert!(err.is_remote());
    Ok(())
}
