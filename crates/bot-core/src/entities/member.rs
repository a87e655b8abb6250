//! Member entity - a user's membership in a guild

use crate::entities::VoiceState;
use crate::value_objects::Snowflake;

/// Guild member entity (junction between User and Guild)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildMember {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub nickname: Option<String>,
    pub role_ids: Vec<Snowflake>,
    pub joined_at: Option<String>,
    pub premium_since: Option<String>,
    pub deaf: bool,
    pub mute: bool,
    pub voice_state: Option<VoiceState>,
}

impl GuildMember {
    /// Create a new GuildMember
    pub fn new(guild_id: Snowflake, user_id: Snowflake) -> Self {
        Self {
            guild_id,
            user_id,
            nickname: None,
            role_ids: Vec::new(),
            joined_at: None,
            premium_since: None,
            deaf: false,
            mute: false,
            voice_state: None,
        }
    }

    /// Get display name (nickname if set, otherwise fallback)
    pub fn display_name<'a>(&'a self, username: &'a str) -> &'a str {
        self.nickname.as_deref().unwrap_or(username)
    }

    /// Check if member has a specific role
    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Set the member's roles (replaces all existing roles)
    pub fn set_roles(&mut self, role_ids: Vec<Snowflake>) {
        self.role_ids = role_ids;
    }

    /// Update the member's nickname
    pub fn set_nickname(&mut self, nickname: Option<String>) {
        self.nickname = nickname;
    }

    /// Channel the member is connected to, if any
    #[inline]
    pub fn voice_channel_id(&self) -> Option<Snowflake> {
        self.voice_state.as_ref().and_then(|vs| vs.channel_id)
    }
}
