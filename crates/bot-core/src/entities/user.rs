//! User entity - a gateway account shared across every guild it belongs to

use std::fmt;
use std::str::FromStr;

use crate::value_objects::Snowflake;

/// Presence status of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnlineStatus {
    Online,
    DoNotDisturb,
    Idle,
    Invisible,
    #[default]
    Offline,
}

impl OnlineStatus {
    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::DoNotDisturb => "dnd",
            Self::Idle => "idle",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }

    /// Lenient conversion: anything unrecognized reads as offline
    pub fn from_wire(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for OnlineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "dnd" => Ok(Self::DoNotDisturb),
            "idle" => Ok(Self::Idle),
            "invisible" => Ok(Self::Invisible),
            "offline" => Ok(Self::Offline),
            _ => Err(format!("Invalid status: {s}")),
        }
    }
}

impl fmt::Display for OnlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of activity shown under a user's name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActivityType {
    #[default]
    Game,
    Streaming,
    Listening,
    Watching,
    Custom,
    Competing,
}

impl From<u8> for ActivityType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Streaming,
            2 => Self::Listening,
            3 => Self::Watching,
            4 => Self::Custom,
            5 => Self::Competing,
            _ => Self::Game,
        }
    }
}

impl From<ActivityType> for u8 {
    fn from(kind: ActivityType) -> Self {
        match kind {
            ActivityType::Game => 0,
            ActivityType::Streaming => 1,
            ActivityType::Listening => 2,
            ActivityType::Watching => 3,
            ActivityType::Custom => 4,
            ActivityType::Competing => 5,
        }
    }
}

/// A single presence activity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Activity {
    pub name: String,
    pub kind: ActivityType,
    pub url: Option<String>,
    pub created_at: Option<i64>,
    pub details: Option<String>,
    pub state: Option<String>,
}

/// Per-platform status of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientStatus {
    pub desktop: OnlineStatus,
    pub mobile: OnlineStatus,
    pub web: OnlineStatus,
}

/// User entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    pub discriminator: String,
    pub avatar: Option<String>,
    pub bot: bool,
    pub status: OnlineStatus,
    pub activities: Vec<Activity>,
    pub client_status: ClientStatus,
}

impl User {
    /// Create a new User with required fields
    pub fn new(id: Snowflake, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            discriminator: "0000".to_string(),
            avatar: None,
            bot: false,
            status: OnlineStatus::Offline,
            activities: Vec::new(),
            client_status: ClientStatus::default(),
        }
    }

    /// Get the full tag: username#discriminator
    pub fn tag(&self) -> String {
        format!("{}#{}", self.username, self.discriminator)
    }

    /// Mention string usable in message content
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Copy account fields from a fresher snapshot, keeping presence data
    pub fn merge_account(&mut self, other: &User) {
        self.username.clone_from(&other.username);
        self.discriminator.clone_from(&other.discriminator);
        self.avatar.clone_from(&other.avatar);
        self.bot = other.bot;
    }
}
