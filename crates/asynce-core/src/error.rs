//! Error taxonomy shared by every AsyncE crate.
//!
//! Remote failures become domain failures in exactly one place
//! ([`crate::envelope::unwrap`]); everything above that propagates these
//! variants unmodified.

/// Domain errors raised by the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The envelope carried `Err`, or the remote returned no envelope at all.
    #[error("remote call failed: {0}")]
    RemoteCallFailed(String),

    /// A single chunk query or command failed; the whole transfer fails with it.
    #[error("chunk {index} failed: {message}")]
    ChunkFailed { index: u64, message: String },

    /// Socket or remote-call transport failure (connect, open, send).
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed sizes, identifiers, chunk lengths or frames.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// True for failures reported by the remote side rather than produced locally.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::RemoteCallFailed(_) | Error::ChunkFailed { .. })
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub fn transport(message: impl std::fmt::Display) -> Self {
        Error::Transport(message.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
