//! Ports - the interfaces the core calls out through
//!
//! The infrastructure layers (HTTP, voice transport, files) provide the
//! implementations; the core only depends on these traits.

mod commands;
mod controller;
mod rest;
mod voice;

use crate::error::DomainError;

/// Result type for collaborator operations
pub type RepoResult<T> = Result<T, DomainError>;

pub use commands::CommandsConfig;
pub use controller::{Controller, GuildAdmin};
pub use rest::{RestClient, RestMethod, RestResponse};
pub use voice::{
    AudioSource, SharedAudioSource, SongInfo, SongResolver, SpeakingFinished, VoiceConnection,
    VoiceConnector, VoiceServerInfo,
};
