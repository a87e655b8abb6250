//! Connection state

use std::fmt;

/// Handshake chosen after HELLO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Start a fresh session
    Identify,
    /// Continue the held session
    Resume,
}

/// Connection lifecycle
///
/// `Disconnected -> Connecting -> AwaitingHello -> Authenticating -> Live`,
/// and back to `Disconnected` through `Terminating` on quit, or directly
/// when the socket drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Socket is being opened
    Connecting,
    /// Socket open, waiting for HELLO
    AwaitingHello,
    /// IDENTIFY or RESUME is being sent
    Authenticating(AuthMode),
    /// Handshake sent, heartbeating
    Live,
    /// Explicit shutdown in progress
    Terminating,
}

impl ConnectionState {
    #[inline]
    pub fn is_live(self) -> bool {
        self == Self::Live
    }

    /// Whether a socket is (being) held
    pub fn has_socket(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingHello | Self::Authenticating(_) | Self::Live
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::AwaitingHello => f.write_str("awaiting_hello"),
            Self::Authenticating(AuthMode::Identify) => f.write_str("identifying"),
            Self::Authenticating(AuthMode::Resume) => f.write_str("resuming"),
            Self::Live => f.write_str("live"),
            Self::Terminating => f.write_str("terminating"),
        }
    }
}
