//! Channel entity - a text, voice, DM, or category channel

use crate::value_objects::Snowflake;

/// Channel type enum (gateway numeric values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelType {
    #[default]
    GuildText,
    Dm,
    GuildVoice,
    GroupDm,
    GuildCategory,
    GuildNews,
    GuildStore,
    GuildStageVoice,
    Unknown(u8),
}

impl ChannelType {
    /// Whether messages can be posted to this channel through REST
    #[inline]
    pub fn is_text(self) -> bool {
        matches!(self, Self::GuildText | Self::Dm | Self::GroupDm | Self::GuildNews)
    }

    /// Whether the bot can join this channel for audio
    #[inline]
    pub fn is_voice(self) -> bool {
        matches!(self, Self::GuildVoice | Self::GuildStageVoice)
    }
}

impl From<u8> for ChannelType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::GuildText,
            1 => Self::Dm,
            2 => Self::GuildVoice,
            3 => Self::GroupDm,
            4 => Self::GuildCategory,
            5 => Self::GuildNews,
            6 => Self::GuildStore,
            13 => Self::GuildStageVoice,
            other => Self::Unknown(other),
        }
    }
}

impl From<ChannelType> for u8 {
    fn from(ct: ChannelType) -> Self {
        match ct {
            ChannelType::GuildText => 0,
            ChannelType::Dm => 1,
            ChannelType::GuildVoice => 2,
            ChannelType::GroupDm => 3,
            ChannelType::GuildCategory => 4,
            ChannelType::GuildNews => 5,
            ChannelType::GuildStore => 6,
            ChannelType::GuildStageVoice => 13,
            ChannelType::Unknown(other) => other,
        }
    }
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub name: Option<String>,
    pub channel_type: ChannelType,
    pub topic: Option<String>,
    pub position: i32,
    pub parent_id: Option<Snowflake>,
    pub user_limit: Option<u32>,
    pub bitrate: Option<u32>,
}

impl Channel {
    /// Create a new guild channel of the given type
    pub fn new(id: Snowflake, guild_id: Snowflake, channel_type: ChannelType) -> Self {
        Self {
            id,
            guild_id: Some(guild_id),
            name: None,
            channel_type,
            topic: None,
            position: 0,
            parent_id: None,
            user_limit: None,
            bitrate: None,
        }
    }

    /// Create a DM channel (no guild)
    pub fn new_dm(id: Snowflake) -> Self {
        Self {
            id,
            guild_id: None,
            name: None,
            channel_type: ChannelType::Dm,
            topic: None,
            position: 0,
            parent_id: None,
            user_limit: None,
            bitrate: None,
        }
    }

    /// Check if this is a DM channel
    #[inline]
    pub fn is_dm(&self) -> bool {
        self.guild_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_type_conversion() {
        assert_eq!(ChannelType::from(2), ChannelType::GuildVoice);
        assert_eq!(ChannelType::from(13), ChannelType::GuildStageVoice);
        assert_eq!(ChannelType::from(99), ChannelType::Unknown(99));
        assert_eq!(u8::from(ChannelType::Unknown(99)), 99);
    }

    #[test]
    fn test_channel_capabilities() {
        assert!(ChannelType::GuildText.is_text());
        assert!(ChannelType::Dm.is_text());
        assert!(!ChannelType::GuildVoice.is_text());
        assert!(ChannelType::GuildVoice.is_voice());
        assert!(!ChannelType::GuildCategory.is_voice());
    }

    #[test]
    fn test_dm_channel() {
        let dm = Channel::new_dm(Snowflake::new(5));
        assert!(dm.is_dm());
        assert_eq!(dm.channel_type, ChannelType::Dm);

        let text = Channel::new(Snowflake::new(6), Snowflake::new(1), ChannelType::GuildText);
        assert!(!text.is_dm());
    }
}
