//! asynce-ctl: command-line client for the AsyncE backend.

mod cmd;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use asynce_core::config::AsynceConfig;
use asynce_core::model::{GroupId, MeetingId};
use asynce_services::{GroupStore, Session, SessionContext, TransferClient};

use cmd::http::HttpRemote;

#[derive(Parser)]
#[command(name = "asynce-ctl", version, about = "AsyncE command-line client")]
struct Cli {
    /// Override the backend url from the config file
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account with a profile picture
    Register { username: String, picture: PathBuf },
    /// Show the current account
    Whoami,
    /// Replace the profile picture
    UploadProfilePicture { picture: PathBuf },
    /// Download the profile picture
    FetchProfilePicture { out: PathBuf },

    /// List every group the account belongs to
    Groups,
    /// Show one group
    Group { group: GroupId },
    /// Create a group with a picture
    CreateGroup { name: String, picture: PathBuf },
    /// Download a group's picture
    FetchGroupPicture { group: GroupId, out: PathBuf },
    /// Invite a user to a group
    Invite { group: GroupId, username: String },
    /// List pending group invites
    Invites,
    /// Accept or decline a group invite
    Respond {
        group: GroupId,
        #[arg(long)]
        decline: bool,
    },

    /// List a group's meetings
    Meetings { group: GroupId },
    /// Create a meeting in a group
    CreateMeeting { group: GroupId, title: String },
    /// Upload a recording to a meeting
    UploadVideo {
        group: GroupId,
        meeting: MeetingId,
        video: PathBuf,
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Download a meeting's video, or a single frame of it
    FetchVideo {
        group: GroupId,
        meeting: MeetingId,
        out: PathBuf,
        #[arg(long)]
        frame: Option<u64>,
    },
    /// Fetch every meeting thumbnail of a group
    Thumbnails {
        group: GroupId,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Show a group's chat history
    Chats { group: GroupId },
    /// Send a chat message over the realtime channel
    Chat {
        group: GroupId,
        username: String,
        text: String,
    },
    /// Print realtime chat and invite events
    Listen,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = AsynceConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "could not write default config");
    }
    let config = AsynceConfig::load().context("failed to load config")?;

    let mut context = SessionContext::from_config(&config);
    if let Some(backend) = cli.backend {
        context.backend_url = backend;
    }
    if context.is_anonymous() {
        tracing::warn!("no identity configured, calls run anonymously");
    }

    let remote = Arc::new(HttpRemote::new(&context, config.backend.request_timeout_secs)?);
    let mut session = Session::new(context, remote);
    let transfer = TransferClient::from_config(&config.transfer)?;
    let store = GroupStore::new(session.actor().clone(), transfer);

    match cli.command {
        Command::Register { username, picture } => {
            cmd::users::cmd_register(&store, &username, &picture).await?
        }
        Command::Whoami => cmd::users::cmd_whoami(&store).await?,
        Command::UploadProfilePicture { picture } => {
            cmd::users::cmd_upload_profile_picture(&store, &picture).await?
        }
        Command::FetchProfilePicture { out } => {
            cmd::users::cmd_fetch_profile_picture(&store, &out).await?
        }

        Command::Groups => cmd::groups::cmd_groups(&store).await?,
        Command::Group { group } => cmd::groups::cmd_group(&store, group).await?,
        Command::CreateGroup { name, picture } => {
            cmd::groups::cmd_create_group(&store, &name, &picture).await?
        }
        Command::FetchGroupPicture { group, out } => {
            cmd::groups::cmd_fetch_group_picture(&store, group, &out).await?
        }
        Command::Invite { group, username } => {
            cmd::groups::cmd_invite(&store, group, &username).await?
        }
        Command::Invites => cmd::groups::cmd_invites(&store).await?,
        Command::Respond { group, decline } => {
            cmd::groups::cmd_respond(&store, group, !decline).await?
        }

        Command::Meetings { group } => cmd::meetings::cmd_meetings(&store, group).await?,
        Command::CreateMeeting { group, title } => {
            cmd::meetings::cmd_create_meeting(&store, group, &title).await?
        }
        Command::UploadVideo { group, meeting, video, title } => {
            cmd::meetings::cmd_upload_video(&store, group, meeting, &video, &title).await?
        }
        Command::FetchVideo { group, meeting, out, frame } => {
            cmd::meetings::cmd_fetch_video(&store, group, meeting, frame, &out).await?
        }
        Command::Thumbnails { group, out_dir } => {
            cmd::meetings::cmd_thumbnails(&store, group, out_dir.as_deref()).await?
        }

        Command::Chats { group } => cmd::chat::cmd_chats(&store, group).await?,
        Command::Chat { group, username, text } => {
            cmd::chat::cmd_send(&mut session, group, &username, &text).await?
        }
        Command::Listen => cmd::chat::cmd_listen(&mut session, &store).await?,
    }

    session.logout().await;
    Ok(())
}
