//! Voice state - a member's association with a voice channel

use crate::value_objects::Snowflake;

/// At most one per member; `channel_id == None` means "not connected".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoiceState {
    pub guild_id: Snowflake,
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub session_id: String,
    pub deaf: bool,
    pub mute: bool,
    pub self_deaf: bool,
    pub self_mute: bool,
    pub self_stream: bool,
    pub suppress: bool,
}

impl VoiceState {
    pub fn new(guild_id: Snowflake, channel_id: Option<Snowflake>, user_id: Snowflake) -> Self {
        Self {
            guild_id,
            channel_id,
            user_id,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.channel_id.is_some()
    }
}
