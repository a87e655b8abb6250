//! Gateway event types
//!
//! Dispatch event names are routed through a compile-time hash table: the
//! name is hashed once, matched against precomputed constants, and the match
//! is confirmed with a single string compare.

use std::fmt;

/// Adler-32 checksum of an event name, usable in `const` context
#[allow(clippy::cast_lossless)]
pub const fn event_hash(name: &str) -> u32 {
    const MOD_ADLER: u32 = 65_521;

    let bytes = name.as_bytes();
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        a = (a + bytes[i] as u32) % MOD_ADLER;
        b = (b + a) % MOD_ADLER;
        i += 1;
    }
    (b << 16) | a
}

/// Dispatch events the client understands
///
/// These are the event names sent in the `t` field of dispatch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    // Connection events
    /// Sent after successful Identify
    Ready,
    /// Sent after successful Resume
    Resumed,

    // Guild events
    /// Guild available, joined, or created
    GuildCreate,
    /// Guild became unavailable, or the bot left it
    GuildDelete,

    // Channel events
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,

    // Member events
    GuildMemberAdd,
    /// Member updated (roles, nickname)
    GuildMemberUpdate,
    GuildMemberRemove,
    GuildBanAdd,

    // Presence events
    PresenceUpdate,

    // Voice events
    VoiceStateUpdate,
    /// Voice server assigned for the bot's own voice session
    VoiceServerUpdate,

    // Message events
    MessageCreate,
    MessageUpdate,
    MessageDelete,
}

const READY: u32 = event_hash("READY");
const RESUMED: u32 = event_hash("RESUMED");
const GUILD_CREATE: u32 = event_hash("GUILD_CREATE");
const GUILD_DELETE: u32 = event_hash("GUILD_DELETE");
const CHANNEL_CREATE: u32 = event_hash("CHANNEL_CREATE");
const CHANNEL_UPDATE: u32 = event_hash("CHANNEL_UPDATE");
const CHANNEL_DELETE: u32 = event_hash("CHANNEL_DELETE");
const GUILD_MEMBER_ADD: u32 = event_hash("GUILD_MEMBER_ADD");
const GUILD_MEMBER_UPDATE: u32 = event_hash("GUILD_MEMBER_UPDATE");
const GUILD_MEMBER_REMOVE: u32 = event_hash("GUILD_MEMBER_REMOVE");
const GUILD_BAN_ADD: u32 = event_hash("GUILD_BAN_ADD");
const PRESENCE_UPDATE: u32 = event_hash("PRESENCE_UPDATE");
const VOICE_STATE_UPDATE: u32 = event_hash("VOICE_STATE_UPDATE");
const VOICE_SERVER_UPDATE: u32 = event_hash("VOICE_SERVER_UPDATE");
const MESSAGE_CREATE: u32 = event_hash("MESSAGE_CREATE");
const MESSAGE_UPDATE: u32 = event_hash("MESSAGE_UPDATE");
const MESSAGE_DELETE: u32 = event_hash("MESSAGE_DELETE");

impl GatewayEventType {
    /// Every known event, in declaration order
    pub const ALL: [Self; 17] = [
        Self::Ready,
        Self::Resumed,
        Self::GuildCreate,
        Self::GuildDelete,
        Self::ChannelCreate,
        Self::ChannelUpdate,
        Self::ChannelDelete,
        Self::GuildMemberAdd,
        Self::GuildMemberUpdate,
        Self::GuildMemberRemove,
        Self::GuildBanAdd,
        Self::PresenceUpdate,
        Self::VoiceStateUpdate,
        Self::VoiceServerUpdate,
        Self::MessageCreate,
        Self::MessageUpdate,
        Self::MessageDelete,
    ];

    /// Get the string representation of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::ChannelCreate => "CHANNEL_CREATE",
            Self::ChannelUpdate => "CHANNEL_UPDATE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::GuildMemberAdd => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove => "GUILD_MEMBER_REMOVE",
            Self::GuildBanAdd => "GUILD_BAN_ADD",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::VoiceStateUpdate => "VOICE_STATE_UPDATE",
            Self::VoiceServerUpdate => "VOICE_SERVER_UPDATE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
        }
    }

    /// Resolve an event name; `None` for events the client does not handle
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let event = match event_hash(name) {
            READY => Self::Ready,
            RESUMED => Self::Resumed,
            GUILD_CREATE => Self::GuildCreate,
            GUILD_DELETE => Self::GuildDelete,
            CHANNEL_CREATE => Self::ChannelCreate,
            CHANNEL_UPDATE => Self::ChannelUpdate,
            CHANNEL_DELETE => Self::ChannelDelete,
            GUILD_MEMBER_ADD => Self::GuildMemberAdd,
            GUILD_MEMBER_UPDATE => Self::GuildMemberUpdate,
            GUILD_MEMBER_REMOVE => Self::GuildMemberRemove,
            GUILD_BAN_ADD => Self::GuildBanAdd,
            PRESENCE_UPDATE => Self::PresenceUpdate,
            VOICE_STATE_UPDATE => Self::VoiceStateUpdate,
            VOICE_SERVER_UPDATE => Self::VoiceServerUpdate,
            MESSAGE_CREATE => Self::MessageCreate,
            MESSAGE_UPDATE => Self::MessageUpdate,
            MESSAGE_DELETE => Self::MessageDelete,
            _ => return None,
        };
        // An unknown name can share a hash with a known one
        (event.as_str() == name).then_some(event)
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<GatewayEventType> for String {
    fn from(event: GatewayEventType) -> Self {
        event.as_str().to_string()
    }
}
