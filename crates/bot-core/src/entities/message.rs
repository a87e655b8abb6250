//! Message - transient snapshot built per dispatched event, never cached

use crate::entities::{Channel, GuildMember, User};
use crate::value_objects::Snowflake;

/// Which message event produced a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageAction {
    Create,
    Edit,
    Delete,
}

/// Message snapshot handed to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub channel: Channel,
    pub guild_id: Option<Snowflake>,
    pub author: Option<User>,
    pub member: Option<GuildMember>,
    pub content: String,
    pub timestamp: Option<String>,
    pub edited_timestamp: Option<String>,
    pub tts: bool,
    pub mention_everyone: bool,
    pub mentions: Vec<User>,
}

impl Message {
    /// Check if message was sent inside a guild
    #[inline]
    pub fn is_guild_message(&self) -> bool {
        self.guild_id.is_some()
    }

    /// Check if the given user is mentioned explicitly
    pub fn mentions_user(&self, user_id: Snowflake) -> bool {
        self.mentions.iter().any(|u| u.id == user_id)
    }
}
