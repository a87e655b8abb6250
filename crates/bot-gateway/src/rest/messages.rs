//! Outgoing message bodies

use bot_core::{Embed, Snowflake};
use serde::Serialize;

/// Body of `POST /channels/{channel}/messages`
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessage<'a> {
    pub content: &'a str,
    pub tts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<&'a Embed>,
}

impl CreateMessage<'_> {
    pub fn path(channel_id: Snowflake) -> String {
        format!("/channels/{channel_id}/messages")
    }
}

/// Body of `POST /users/@me/channels`, which opens or reuses a DM channel
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreateDirectChannel {
    pub recipient_id: Snowflake,
}

impl CreateDirectChannel {
    pub const PATH: &'static str = "/users/@me/channels";
}
