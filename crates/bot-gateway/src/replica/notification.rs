//! Derived notifications returned by the replica

use bot_core::{Channel, Guild, GuildMember, Message, MessageAction, Snowflake, User, VoiceServerInfo};

/// What an applied event changed, carrying post-change snapshots
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Ready(User),
    Resumed,

    GuildJoined(Guild),
    /// A guild from the unavailable set (or already cached) came back
    GuildAvailable(Guild),
    GuildUnavailable(Guild),
    GuildLeft(Guild),

    ChannelCreated(Channel),
    ChannelUpdated(Channel),
    ChannelDeleted(Channel),

    MemberAdded {
        guild_id: Snowflake,
        member: GuildMember,
        user: User,
    },
    MemberUpdated {
        guild_id: Snowflake,
        member: GuildMember,
    },
    MemberRemoved {
        guild_id: Snowflake,
        member: GuildMember,
        user: User,
        banned: bool,
    },

    PresenceUpdated {
        guild_id: Snowflake,
        member: GuildMember,
        user: User,
    },

    VoiceStateUpdated {
        guild_id: Snowflake,
        member: GuildMember,
        old: Option<Channel>,
        new: Option<Channel>,
        /// The member is the bot itself
        is_bot: bool,
    },
    /// The bot's voice server is known; the transport can be opened
    VoiceServerAssigned(VoiceServerInfo),

    Message {
        action: MessageAction,
        message: Message,
    },
}

impl Notification {
    /// Guild the notification is scoped to, if any
    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::Ready(_) | Self::Resumed => None,
            Self::GuildJoined(g)
            | Self::GuildAvailable(g)
            | Self::GuildUnavailable(g)
            | Self::GuildLeft(g) => Some(g.id),
            Self::ChannelCreated(c) | Self::ChannelUpdated(c) | Self::ChannelDeleted(c) => {
                c.guild_id
            }
            Self::MemberAdded { guild_id, .. }
            | Self::MemberUpdated { guild_id, .. }
            | Self::MemberRemoved { guild_id, .. }
            | Self::PresenceUpdated { guild_id, .. }
            | Self::VoiceStateUpdated { guild_id, .. } => Some(*guild_id),
            Self::VoiceServerAssigned(info) => Some(info.guild_id),
            Self::Message { message, .. } => message.guild_id,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::Resumed => "resumed",
            Self::GuildJoined(_) => "guild_joined",
            Self::GuildAvailable(_) => "guild_available",
            Self::GuildUnavailable(_) => "guild_unavailable",
            Self::GuildLeft(_) => "guild_left",
            Self::ChannelCreated(_) => "channel_created",
            Self::ChannelUpdated(_) => "channel_updated",
            Self::ChannelDeleted(_) => "channel_deleted",
            Self::MemberAdded { .. } => "member_added",
            Self::MemberUpdated { .. } => "member_updated",
            Self::MemberRemoved { .. } => "member_removed",
            Self::PresenceUpdated { .. } => "presence_updated",
            Self::VoiceStateUpdated { .. } => "voice_state_updated",
            Self::VoiceServerAssigned(_) => "voice_server_assigned",
            Self::Message { .. } => "message",
        }
    }
}
