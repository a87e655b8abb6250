//! Bus topics and messages

use std::fmt;

use bot_core::Snowflake;

/// Delivery channel; FIFO holds within a topic only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Advance a guild's playback queue
    QueueNextSong,
    /// Reopen the socket and resume the session
    Resume,
    /// Reopen the socket with a fresh session
    Reconnect,
    /// Shut the client down
    Quit,
}

impl Topic {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueueNextSong => "queue_next_song",
            Self::Resume => "resume",
            Self::Reconnect => "reconnect",
            Self::Quit => "quit",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message posted on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMessage {
    QueueNextSong(Snowflake),
    Resume,
    Reconnect,
    Quit,
}

impl BusMessage {
    #[must_use]
    pub const fn topic(self) -> Topic {
        match self {
            Self::QueueNextSong(_) => Topic::QueueNextSong,
            Self::Resume => Topic::Resume,
            Self::Reconnect => Topic::Reconnect,
            Self::Quit => Topic::Quit,
        }
    }
}
