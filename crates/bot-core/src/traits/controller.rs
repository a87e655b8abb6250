//! Observer ports fed by the state replica
//!
//! Every callback has an empty default body so a controller only overrides
//! what it cares about. Callbacks run on the dispatch task; anything slow
//! should be spawned.

use std::sync::Arc;

use crate::entities::{Channel, Guild, GuildMember, Message, MessageAction, User};
use crate::value_objects::Snowflake;

/// Process-wide observer of gateway activity
#[allow(unused_variables)]
pub trait Controller: Send + Sync {
    fn on_ready(&self, bot: &User) {}

    fn on_resume(&self) {}

    fn on_disconnect(&self) {}

    /// Fired last during shutdown, after caches are cleared
    fn on_quit(&self) {}

    fn on_guild_join(&self, guild: &Guild) {}

    fn on_guild_leave(&self, guild: &Guild) {}

    fn on_guild_available(&self, guild: &Guild) {}

    fn on_guild_unavailable(&self, guild: &Guild) {}

    fn on_member_add(&self, guild_id: Snowflake, member: &GuildMember, user: &User) {}

    fn on_member_update(&self, guild_id: Snowflake, member: &GuildMember) {}

    fn on_member_remove(&self, guild_id: Snowflake, member: &GuildMember, user: &User) {}

    fn on_presence_update(&self, guild_id: Snowflake, member: &GuildMember, user: &User) {}

    /// `old` and `new` let observers tell a join from a move from a leave
    fn on_voice_state_update(
        &self,
        guild_id: Snowflake,
        member: &GuildMember,
        old: Option<&Channel>,
        new: Option<&Channel>,
    ) {
    }

    fn on_message(&self, message: &Message) {}

    fn on_message_edited(&self, message: &Message) {}

    fn on_message_deleted(&self, message: &Message) {}

    /// Playback of the current audio item finished in a guild
    fn on_end_speaking(&self, guild_id: Snowflake) {}

    /// Guild-scoped handler, if one is registered for this guild
    fn guild_admin(&self, guild_id: Snowflake) -> Option<Arc<dyn GuildAdmin>> {
        None
    }
}

/// Guild-scoped capability: a handler either implements all of these or is
/// not registered at all.
pub trait GuildAdmin: Send + Sync {
    fn on_message_event(&self, action: MessageAction, message: &Message);

    /// `channel` is the channel left, or the channel joined when none was left
    fn on_user_voice_state_changed(&self, channel: &Channel, member: &GuildMember);
}
