//! Domain errors - failures reported back through collaborator ports

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Guild not found: {0}")]
    GuildNotFound(Snowflake),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Snowflake),

    #[error("Member not found in guild")]
    MemberNotFound,

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported channel type for this operation")]
    UnsupportedChannel,
}

impl DomainError {
    /// Get an error code string for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::GuildNotFound(_) => "UNKNOWN_GUILD",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::MemberNotFound => "UNKNOWN_MEMBER",
            Self::Http { .. } => "HTTP_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Voice(_) => "VOICE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::UnsupportedChannel => "UNSUPPORTED_CHANNEL",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GuildNotFound(_) | Self::ChannelNotFound(_) | Self::MemberNotFound
        ) || matches!(self, Self::Http { status: 404, .. })
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
