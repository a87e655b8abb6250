//! Gateway events
//!
//! Dispatch event names and the payloads the replica decodes.

mod event_types;
mod payloads;

pub use event_types::{event_hash, GatewayEventType};
pub use payloads::{
    known_roles, ActivityData, ChannelPayload, ClientStatusPayload, GuildCreateEvent,
    GuildMemberRemoveEvent, GuildMemberUpdateEvent, MemberPayload, MessagePayload,
    PartialUserPayload, PresencePayload, ReadyEvent, RolePayload, UnavailableGuild, UserPayload,
    VoiceServerUpdateEvent, VoiceStatePayload,
};
