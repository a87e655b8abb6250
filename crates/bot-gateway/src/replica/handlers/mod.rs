//! Per-family dispatch handlers
//!
//! Each handler returns `Ok(None)` for events that reference something the
//! cache does not know yet, and `Err` only for bodies that fail to decode.

mod channel;
mod guild;
mod member;
mod message;
mod presence;
mod voice;

pub use channel::ChannelHandler;
pub use guild::GuildHandler;
pub use member::MemberHandler;
pub use message::MessageHandler;
pub use presence::PresenceHandler;
pub use voice::VoiceHandler;
