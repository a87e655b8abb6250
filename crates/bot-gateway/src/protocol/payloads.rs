//! Handshake and command payloads
//!
//! Bodies of the control frames the client sends (and HELLO, which it reads).

use bot_core::{ActivityType, Intents, OnlineStatus, Snowflake};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Heartbeat interval the gateway typically announces (41.25 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 41_250;

    /// Create a Hello payload with custom interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::with_interval(Self::DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// Payload for op 2 (Identify)
///
/// Starts a fresh session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Bot token (without the `Bot ` prefix)
    pub token: String,

    /// Client properties
    pub properties: IdentifyProperties,

    /// Initial presence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdatePayload>,

    /// Event families to subscribe to
    pub intents: Intents,
}

impl IdentifyPayload {
    #[must_use]
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            properties: IdentifyProperties::default(),
            presence: None,
            intents,
        }
    }

    #[must_use]
    pub fn with_presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }
}

/// Client connection properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    #[serde(rename = "$os")]
    pub os: String,

    /// Library name
    #[serde(rename = "$browser")]
    pub browser: String,

    /// Library name
    #[serde(rename = "$device")]
    pub device: String,
}

impl IdentifyProperties {
    /// Name reported as browser and device
    pub const LIBRARY: &'static str = "gatebot";

    /// Set operating system
    #[must_use]
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: Self::LIBRARY.to_string(),
            device: Self::LIBRARY.to_string(),
        }
    }
}

/// Activity shown in a presence update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub name: String,

    /// Only honoured for streaming activities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// 1 (streaming) when a url is set, otherwise 0 (playing)
    #[serde(rename = "type")]
    pub kind: u8,
}

impl ActivityPayload {
    #[must_use]
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        let kind = if url.is_some() {
            ActivityType::Streaming
        } else {
            ActivityType::Game
        };
        Self {
            name: name.into(),
            url,
            kind: kind.into(),
        }
    }
}

/// Payload for op 3 (Presence Update)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    /// Unix time (ms) since the client went idle, or null
    pub since: Option<u64>,

    /// online, dnd, idle, invisible, offline
    pub status: String,

    pub afk: bool,

    pub game: Option<ActivityPayload>,
}

impl PresenceUpdatePayload {
    /// Valid status values
    pub const VALID_STATUSES: &'static [&'static str] =
        &["online", "dnd", "idle", "invisible", "offline"];

    #[must_use]
    pub fn new(status: OnlineStatus) -> Self {
        Self {
            since: None,
            status: status.as_str().to_string(),
            afk: false,
            game: None,
        }
    }

    /// Check if the status is valid
    #[must_use]
    pub fn is_valid_status(&self) -> bool {
        Self::VALID_STATUSES.contains(&self.status.as_str())
    }
}

impl Default for PresenceUpdatePayload {
    fn default() -> Self {
        Self::new(OnlineStatus::Online)
    }
}

/// Payload for op 6 (Resume)
///
/// Sent by the client to resume a disconnected session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Bot token
    pub token: String,

    /// Session ID to resume
    pub session_id: String,

    /// Last received sequence number
    pub seq: Option<u64>,
}

/// Payload for op 4 (Voice State Update)
///
/// `channel_id: null` leaves voice in that guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateUpdatePayload {
    pub guild_id: Snowflake,
    pub channel_id: Option<Snowflake>,
    pub self_mute: bool,
    pub self_deaf: bool,
}

impl VoiceStateUpdatePayload {
    #[must_use]
    pub fn join(guild_id: Snowflake, channel_id: Snowflake) -> Self {
        Self {
            guild_id,
            channel_id: Some(channel_id),
            self_mute: false,
            self_deaf: false,
        }
    }

    #[must_use]
    pub fn leave(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            channel_id: None,
            self_mute: false,
            self_deaf: false,
        }
    }
}
