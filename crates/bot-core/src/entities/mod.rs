//! Replicated entities - the cached object graph
//!
//! Relations are stored as [`Snowflake`](crate::Snowflake) lookups: a member
//! names its user by id, a voice state names its channel by id.

mod channel;
mod embed;
mod guild;
mod member;
mod message;
mod role;
mod user;
mod voice_state;

pub use channel::{Channel, ChannelType};
pub use embed::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedImage};
pub use guild::Guild;
pub use member::GuildMember;
pub use message::{Message, MessageAction};
pub use role::Role;
pub use user::{Activity, ActivityType, ClientStatus, OnlineStatus, User};
pub use voice_state::VoiceState;
