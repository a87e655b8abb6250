//! Dispatch payload definitions
//!
//! Wire shapes of the dispatch bodies the replica consumes, plus conversions
//! into cache entities. Fields the client does not use are not modelled.

use std::collections::HashMap;

use bot_core::{
    Activity, ActivityType, Channel, ChannelType, ClientStatus, Guild, GuildMember, OnlineStatus,
    Permissions, Role, Snowflake, User, VoiceState,
};
use serde::Deserialize;

// === User Payloads ===

/// User object as embedded in events
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl UserPayload {
    pub fn to_user(&self) -> User {
        let mut user = User::new(self.id, self.username.clone());
        if !self.discriminator.is_empty() {
            user.discriminator.clone_from(&self.discriminator);
        }
        user.avatar.clone_from(&self.avatar);
        user.bot = self.bot;
        user
    }
}

/// Presence user: only `id` is guaranteed
#[derive(Debug, Clone, Deserialize)]
pub struct PartialUserPayload {
    pub id: Snowflake,
}

// === Connection Events ===

/// READY event payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    #[serde(default)]
    pub v: u8,

    /// The bot's own user
    pub user: UserPayload,

    /// Guilds the bot is in; all start out unavailable
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,

    /// Session ID for resuming
    pub session_id: String,
}

/// Unavailable guild stub in READY and GUILD_DELETE
#[derive(Debug, Clone, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    /// Absent or false on GUILD_DELETE means the bot left the guild
    #[serde(default)]
    pub unavailable: bool,
}

// === Guild Events ===

/// Role object
#[derive(Debug, Clone, Deserialize)]
pub struct RolePayload {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
}

impl RolePayload {
    pub fn to_role(&self) -> Role {
        Role {
            color: self.color,
            hoist: self.hoist,
            position: self.position,
            managed: self.managed,
            mentionable: self.mentionable,
            ..Role::new(self.id, self.name.clone(), self.permissions)
        }
    }
}

/// Channel object
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub user_limit: Option<u32>,
    #[serde(default)]
    pub bitrate: Option<u32>,
}

impl ChannelPayload {
    /// Build the entity; `guild_id` fills in for channels nested in a guild
    /// snapshot, which omit their own guild id.
    pub fn to_channel(&self, guild_id: Option<Snowflake>) -> Channel {
        Channel {
            id: self.id,
            guild_id: self.guild_id.or(guild_id),
            name: self.name.clone(),
            channel_type: ChannelType::from(self.kind),
            topic: self.topic.clone(),
            position: self.position,
            parent_id: self.parent_id,
            user_limit: self.user_limit,
            bitrate: self.bitrate,
        }
    }
}

/// Member object (GUILD_CREATE members, GUILD_MEMBER_ADD, REST member fetch)
#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub joined_at: Option<String>,
    #[serde(default)]
    pub premium_since: Option<String>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
}

impl MemberPayload {
    /// Build the member and its backing user.
    ///
    /// Roles the guild does not know are dropped. `None` when the payload
    /// carries no user.
    pub fn to_member(&self, guild: &Guild) -> Option<(GuildMember, User)> {
        let user = self.user.as_ref()?.to_user();
        let mut member = GuildMember::new(guild.id, user.id);
        member.nickname.clone_from(&self.nick);
        member.joined_at.clone_from(&self.joined_at);
        member.premium_since.clone_from(&self.premium_since);
        member.deaf = self.deaf;
        member.mute = self.mute;
        member.set_roles(known_roles(guild, &self.roles));
        Some((member, user))
    }
}

/// Filter role ids down to the ones defined in the guild
pub fn known_roles(guild: &Guild, role_ids: &[Snowflake]) -> Vec<Snowflake> {
    role_ids
        .iter()
        .copied()
        .filter(|id| guild.roles.contains_key(id))
        .collect()
}

/// Voice state object
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceStatePayload {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_stream: bool,
    #[serde(default)]
    pub suppress: bool,
    /// Present on VOICE_STATE_UPDATE for guild voice
    #[serde(default)]
    pub member: Option<MemberPayload>,
}

impl VoiceStatePayload {
    pub fn to_voice_state(&self, guild_id: Snowflake) -> VoiceState {
        VoiceState {
            session_id: self.session_id.clone(),
            deaf: self.deaf,
            mute: self.mute,
            self_deaf: self.self_deaf,
            self_mute: self.self_mute,
            self_stream: self.self_stream,
            suppress: self.suppress,
            ..VoiceState::new(guild_id, self.channel_id, self.user_id)
        }
    }
}

/// Activity object as received in presences
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityData {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl ActivityData {
    pub fn to_activity(&self) -> Activity {
        Activity {
            name: self.name.clone(),
            kind: ActivityType::from(self.kind),
            url: self.url.clone(),
            created_at: self.created_at,
            details: self.details.clone(),
            state: self.state.clone(),
        }
    }
}

/// Per-platform status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientStatusPayload {
    #[serde(default)]
    pub desktop: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub web: Option<String>,
}

impl ClientStatusPayload {
    pub fn to_client_status(&self) -> ClientStatus {
        let status = |s: &Option<String>| s.as_deref().map(OnlineStatus::from_wire).unwrap_or_default();
        ClientStatus {
            desktop: status(&self.desktop),
            mobile: status(&self.mobile),
            web: status(&self.web),
        }
    }
}

/// PRESENCE_UPDATE payload, also the entries of GUILD_CREATE `presences`
#[derive(Debug, Clone, Deserialize)]
pub struct PresencePayload {
    pub user: PartialUserPayload,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub activities: Vec<ActivityData>,
    /// Legacy single-activity field
    #[serde(default)]
    pub game: Option<ActivityData>,
    #[serde(default)]
    pub client_status: ClientStatusPayload,
}

impl PresencePayload {
    /// Copy status and activities onto a cached user
    pub fn apply_to(&self, user: &mut User) {
        user.status = OnlineStatus::from_wire(&self.status);
        user.client_status = self.client_status.to_client_status();
        user.activities = self.activities.iter().map(ActivityData::to_activity).collect();
        if user.activities.is_empty() {
            if let Some(game) = &self.game {
                user.activities.push(game.to_activity());
            }
        }
    }
}

/// GUILD_CREATE event payload
///
/// Sent for each guild after READY, and when the bot joins a guild.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildCreateEvent {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    #[serde(default)]
    pub channels: Vec<ChannelPayload>,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    #[serde(default)]
    pub voice_states: Vec<VoiceStatePayload>,
    #[serde(default)]
    pub presences: Vec<PresencePayload>,
}

impl GuildCreateEvent {
    /// Assemble the full guild and the users backing its members.
    ///
    /// Voice states attach to members already in the snapshot; presences
    /// update the returned user records.
    pub fn build(&self) -> (Guild, HashMap<Snowflake, User>) {
        let mut guild = Guild::new(self.id, self.name.clone());
        guild.icon.clone_from(&self.icon);
        guild.owner_id = self.owner_id;

        for role in &self.roles {
            guild.roles.insert(role.id, role.to_role());
        }
        for channel in &self.channels {
            guild.channels.insert(channel.id, channel.to_channel(Some(self.id)));
        }

        let mut users = HashMap::with_capacity(self.members.len());
        for payload in &self.members {
            if let Some((member, user)) = payload.to_member(&guild) {
                users.insert(user.id, user);
                guild.members.insert(member.user_id, member);
            }
        }

        for state in &self.voice_states {
            if state.channel_id.is_none() {
                continue;
            }
            if let Some(member) = guild.members.get_mut(&state.user_id) {
                member.voice_state = Some(state.to_voice_state(self.id));
            }
        }

        for presence in &self.presences {
            if let Some(user) = users.get_mut(&presence.user.id) {
                presence.apply_to(user);
            }
        }

        (guild, users)
    }
}

// === Member Events ===

/// GUILD_MEMBER_UPDATE event payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMemberUpdateEvent {
    pub guild_id: Snowflake,
    pub user: UserPayload,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub premium_since: Option<String>,
}

/// GUILD_MEMBER_REMOVE and GUILD_BAN_ADD payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMemberRemoveEvent {
    pub guild_id: Snowflake,
    pub user: UserPayload,
}

// === Voice Events ===

/// VOICE_SERVER_UPDATE event payload
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceServerUpdateEvent {
    pub guild_id: Snowflake,
    pub token: String,
    /// Null while the voice server is being reallocated
    #[serde(default)]
    pub endpoint: Option<String>,
}

// === Message Events ===

/// MESSAGE_CREATE / MESSAGE_UPDATE / MESSAGE_DELETE payload
///
/// Updates and deletes may be partial; only `id` and `channel_id` are required.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: Option<UserPayload>,
    #[serde(default)]
    pub member: Option<MemberPayload>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub mentions: Vec<UserPayload>,
}
