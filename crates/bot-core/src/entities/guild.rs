//! Guild entity - a server and its guild-scoped maps

use std::collections::HashMap;

use crate::entities::{Channel, GuildMember, Role};
use crate::value_objects::Snowflake;

/// Guild (server) entity
///
/// Owns its channel, member, and role maps. Members refer to their backing
/// user by id; the user records themselves live in the process-wide table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    pub icon: Option<String>,
    pub owner_id: Option<Snowflake>,
    pub channels: HashMap<Snowflake, Channel>,
    pub members: HashMap<Snowflake, GuildMember>,
    pub roles: HashMap<Snowflake, Role>,
}

impl Guild {
    /// Create an empty guild
    pub fn new(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check if a user is the guild owner
    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == Some(user_id)
    }

    /// Resolved owning member, if cached
    pub fn owner(&self) -> Option<&GuildMember> {
        self.owner_id.and_then(|id| self.members.get(&id))
    }

    pub fn channel(&self, id: Snowflake) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn member(&self, user_id: Snowflake) -> Option<&GuildMember> {
        self.members.get(&user_id)
    }

    pub fn role(&self, id: Snowflake) -> Option<&Role> {
        self.roles.get(&id)
    }

    /// Roles of a member, skipping ids this guild does not know
    pub fn member_roles(&self, member: &GuildMember) -> Vec<&Role> {
        member
            .role_ids
            .iter()
            .filter_map(|id| self.roles.get(id))
            .collect()
    }

    /// Members currently connected to the given voice channel
    pub fn voice_members(&self, channel_id: Snowflake) -> impl Iterator<Item = &GuildMember> {
        self.members
            .values()
            .filter(move |m| m.voice_channel_id() == Some(channel_id))
    }

    /// Get the guild icon URL if set
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("/icons/{}/{}.png", self.id, hash))
    }
}
