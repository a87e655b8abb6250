//! Gateway intents - which event families the session subscribes to

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Intent bits sent with IDENTIFY
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        const GUILDS                   = 1 << 0;
        /// Privileged
        const GUILD_MEMBERS            = 1 << 1;
        const GUILD_BANS               = 1 << 2;
        const GUILD_EMOJIS             = 1 << 3;
        const GUILD_INTEGRATIONS       = 1 << 4;
        const GUILD_WEBHOOKS           = 1 << 5;
        const GUILD_INVITES            = 1 << 6;
        const GUILD_VOICE_STATES       = 1 << 7;
        /// Privileged
        const GUILD_PRESENCES          = 1 << 8;
        const GUILD_MESSAGES           = 1 << 9;
        const GUILD_MESSAGE_REACTIONS  = 1 << 10;
        const GUILD_MESSAGE_TYPING     = 1 << 11;
        const DIRECT_MESSAGES          = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        const DIRECT_MESSAGE_TYPING    = 1 << 14;

        /// Everything the replica consumes
        const DEFAULT = Self::GUILDS.bits()
            | Self::GUILD_MEMBERS.bits()
            | Self::GUILD_BANS.bits()
            | Self::GUILD_VOICE_STATES.bits()
            | Self::GUILD_PRESENCES.bits()
            | Self::GUILD_MESSAGES.bits()
            | Self::DIRECT_MESSAGES.bits();
    }
}

impl Default for Intents {
    fn default() -> Self {
        Intents::DEFAULT
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Intents::from_bits_truncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intents_cover_replica() {
        let intents = Intents::default();
        assert!(intents.contains(Intents::GUILD_VOICE_STATES));
        assert!(intents.contains(Intents::GUILD_MEMBERS));
        assert!(!intents.contains(Intents::GUILD_MESSAGE_TYPING));
    }

    #[test]
    fn test_intents_serialize_as_number() {
        let json = serde_json::to_string(&(Intents::GUILDS | Intents::GUILD_MESSAGES)).unwrap();
        assert_eq!(json, "513");
    }
}
