//! Gateway protocol definitions
//!
//! Op codes, the frame envelope codec, close codes, and handshake payloads.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    ActivityPayload, HelloPayload, IdentifyPayload, IdentifyProperties, PresenceUpdatePayload,
    ResumePayload, VoiceStateUpdatePayload,
};
