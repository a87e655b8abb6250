//! # bot-core
//!
//! Domain layer for the gateway client: the replicated entities, value objects,
//! and the ports through which the core talks to its collaborators (REST layer,
//! controller, voice transport, persisted command preferences).
//! This crate has zero dependencies on infrastructure (sockets, HTTP, files).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Activity, ActivityType, Channel, ChannelType, ClientStatus, Embed, EmbedAuthor, EmbedField,
    EmbedFooter, EmbedImage, Guild, GuildMember, Message, MessageAction, OnlineStatus, Role, User,
    VoiceState,
};
pub use error::DomainError;
pub use traits::{
    AudioSource, CommandsConfig, Controller, GuildAdmin, RepoResult, RestClient, RestMethod,
    RestResponse, SharedAudioSource, SongInfo, SongResolver, SpeakingFinished, VoiceConnection,
    VoiceConnector, VoiceServerInfo,
};
pub use value_objects::{Intents, Permissions, Snowflake, SnowflakeParseError};
