//! Cache state - guild arena, unavailable set, and the user table
//!
//! Every mutation that affects a member also adjusts the user table, so the
//! eviction rule lives here and nowhere else. A guild id is either active or
//! unavailable, never both.

use std::collections::HashMap;

use bot_core::{Channel, Guild, GuildMember, Snowflake, User};

use super::UserTable;

/// How an inserted guild relates to what was cached before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuildInsert {
    /// Never seen before
    Joined,
    /// Was in the unavailable set
    Available,
    /// Replaced an active snapshot
    Refreshed,
}

/// Result of removing a member
#[derive(Debug, Clone)]
pub struct RemovedMember {
    pub member: GuildMember,
    /// User record as it was before the hold was dropped
    pub user: Option<User>,
    pub evicted: bool,
}

/// The replicated object graph
#[derive(Debug, Default)]
pub struct CacheState {
    guilds: HashMap<Snowflake, Guild>,
    /// Unavailable guilds keep their last known snapshot, if any
    unavailable: HashMap<Snowflake, Option<Guild>>,
    users: UserTable,
    bot_user_id: Option<Snowflake>,
}

impl CacheState {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Bot user
    // =========================================================================

    /// Record the bot's own user; the session holds it for its lifetime
    pub fn set_bot_user(&mut self, user: User) {
        match self.bot_user_id {
            Some(id) if id == user.id => {
                self.users.refresh(&user);
            }
            previous => {
                let id = user.id;
                self.users.acquire(user);
                if let Some(previous) = previous {
                    self.users.release(previous);
                }
                self.bot_user_id = Some(id);
            }
        }
    }

    pub fn bot_user_id(&self) -> Option<Snowflake> {
        self.bot_user_id
    }

    pub fn bot_user(&self) -> Option<&User> {
        self.bot_user_id.and_then(|id| self.users.get(id))
    }

    #[inline]
    pub fn is_bot(&self, user_id: Snowflake) -> bool {
        self.bot_user_id == Some(user_id)
    }

    // =========================================================================
    // Guilds
    // =========================================================================

    pub fn guild(&self, id: Snowflake) -> Option<&Guild> {
        self.guilds.get(&id)
    }

    pub fn guild_mut(&mut self, id: Snowflake) -> Option<&mut Guild> {
        self.guilds.get_mut(&id)
    }

    pub fn guilds(&self) -> impl Iterator<Item = &Guild> {
        self.guilds.values()
    }

    pub fn guild_ids(&self) -> Vec<Snowflake> {
        self.guilds.keys().copied().collect()
    }

    #[inline]
    pub fn is_unavailable(&self, id: Snowflake) -> bool {
        self.unavailable.contains_key(&id)
    }

    pub fn unavailable_ids(&self) -> Vec<Snowflake> {
        self.unavailable.keys().copied().collect()
    }

    /// Note a guild announced as unavailable before its data arrived.
    /// Ignored when the guild is already active.
    pub fn note_unavailable(&mut self, id: Snowflake) -> bool {
        if self.guilds.contains_key(&id) {
            return false;
        }
        self.unavailable.entry(id).or_insert(None);
        true
    }

    /// Insert a full guild snapshot.
    ///
    /// `users` supplies the backing records for the snapshot's members. A
    /// member whose user is neither supplied nor already cached is dropped.
    pub fn insert_guild(
        &mut self,
        mut guild: Guild,
        mut users: HashMap<Snowflake, User>,
    ) -> GuildInsert {
        // Take the new holds before dropping the old ones so shared users
        // never pass through zero.
        guild.members.retain(|user_id, _| match users.remove(user_id) {
            Some(user) => {
                self.users.acquire(user);
                true
            }
            None => self.users.retain(*user_id),
        });

        let id = guild.id;
        let outcome = if let Some(previous) = self.unavailable.remove(&id) {
            if let Some(previous) = previous {
                self.release_members(&previous);
            }
            GuildInsert::Available
        } else if let Some(previous) = self.guilds.remove(&id) {
            self.release_members(&previous);
            GuildInsert::Refreshed
        } else {
            GuildInsert::Joined
        };

        self.guilds.insert(id, guild);
        outcome
    }

    /// Move an active guild to the unavailable set, keeping its data.
    /// Returns a snapshot of the guild as it was.
    pub fn mark_unavailable(&mut self, id: Snowflake) -> Option<Guild> {
        let guild = self.guilds.remove(&id)?;
        let snapshot = guild.clone();
        self.unavailable.insert(id, Some(guild));
        Some(snapshot)
    }

    /// Purge a guild from both the active map and the unavailable set
    pub fn remove_guild(&mut self, id: Snowflake) -> Option<Guild> {
        let guild = match self.guilds.remove(&id) {
            Some(guild) => Some(guild),
            None => self.unavailable.remove(&id).flatten(),
        };
        if let Some(guild) = &guild {
            self.release_members(guild);
        }
        guild
    }

    fn release_members(&mut self, guild: &Guild) {
        for user_id in guild.members.keys() {
            self.users.release(*user_id);
        }
    }

    // =========================================================================
    // Channels
    // =========================================================================

    pub fn channel(&self, guild_id: Snowflake, channel_id: Snowflake) -> Option<&Channel> {
        self.guilds.get(&guild_id)?.channels.get(&channel_id)
    }

    /// Find a channel in any active guild
    pub fn find_channel(&self, channel_id: Snowflake) -> Option<&Channel> {
        self.guilds
            .values()
            .find_map(|g| g.channels.get(&channel_id))
    }

    /// Replace a channel wholesale (delete then insert). Returns `false` when
    /// the channel has no guild or the guild is unknown.
    pub fn upsert_channel(&mut self, channel: Channel) -> bool {
        let Some(guild) = channel.guild_id.and_then(|id| self.guilds.get_mut(&id)) else {
            return false;
        };
        guild.channels.remove(&channel.id);
        guild.channels.insert(channel.id, channel);
        true
    }

    pub fn remove_channel(&mut self, guild_id: Snowflake, channel_id: Snowflake) -> Option<Channel> {
        self.guilds.get_mut(&guild_id)?.channels.remove(&channel_id)
    }

    // =========================================================================
    // Members
    // =========================================================================

    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<&GuildMember> {
        self.guilds.get(&guild_id)?.members.get(&user_id)
    }

    /// Insert a member and its backing user.
    ///
    /// Re-inserting an existing member refreshes its fields (keeping the
    /// current voice state) without taking a second hold on the user.
    /// Returns `false` when the guild is unknown.
    pub fn insert_member(&mut self, mut member: GuildMember, user: User) -> bool {
        let Some(guild) = self.guilds.get_mut(&member.guild_id) else {
            return false;
        };
        match guild.members.get_mut(&member.user_id) {
            Some(existing) => {
                if member.voice_state.is_none() {
                    member.voice_state = existing.voice_state.take();
                }
                *existing = member;
                self.users.refresh(&user);
            }
            None => {
                guild.members.insert(member.user_id, member);
                self.users.acquire(user);
            }
        }
        true
    }

    /// Mutate a member in place, returning the updated snapshot
    pub fn update_member<F>(
        &mut self,
        guild_id: Snowflake,
        user_id: Snowflake,
        f: F,
    ) -> Option<GuildMember>
    where
        F: FnOnce(&mut GuildMember),
    {
        let member = self.guilds.get_mut(&guild_id)?.members.get_mut(&user_id)?;
        f(member);
        Some(member.clone())
    }

    /// Remove a member and drop its hold on the user
    pub fn remove_member(&mut self, guild_id: Snowflake, user_id: Snowflake) -> Option<RemovedMember> {
        let member = self.guilds.get_mut(&guild_id)?.members.remove(&user_id)?;
        let user = self.users.get(user_id).cloned();
        let evicted = self.users.release(user_id);
        Some(RemovedMember {
            member,
            user,
            evicted,
        })
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn user(&self, id: Snowflake) -> Option<&User> {
        self.users.get(id)
    }

    pub fn users(&self) -> &UserTable {
        &self.users
    }

    /// Refresh a user's account fields if cached; never creates an entry
    pub fn refresh_user(&mut self, user: &User) -> Option<User> {
        self.users.refresh(user).cloned()
    }

    pub fn update_user<F>(&mut self, id: Snowflake, f: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        self.users.update(id, f).cloned()
    }

    /// Drop everything, including the bot user
    pub fn clear(&mut self) {
        self.guilds.clear();
        self.unavailable.clear();
        self.users.clear();
        self.bot_user_id = None;
    }
}
