use std::fmt;

use board_project::StoreError;
use board_transport::{BlobKey, SoundId, TabId};

/// What a failed lookup was looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Tab(TabId),
    Sound(SoundId),
    Blob(BlobKey),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Tab(id) => write!(f, "tab {id}"),
            Missing::Sound(id) => write!(f, "sound {id}"),
            Missing::Blob(key) => write!(f, "blob {key}"),
        }
    }
}

/// Every variant leaves the session exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0} not found")]
    NotFound(Missing),

    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("unsupported media type '{mime}'")]
    UnsupportedMedia { mime: String },

    #[error("playback of {sound} rejected: {reason}")]
    PlaybackRejected { sound: SoundId, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("failed to decode '{name}': {source}")]
    Decode {
        name: String,
        source: anyhow::Error,
    },

    #[error("failed to fetch '{url}': {source}")]
    Fetch { url: String, source: anyhow::Error },
}

impl SessionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound(_))
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
