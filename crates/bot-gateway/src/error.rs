//! Gateway error types

use bot_common::BotError;
use bot_core::DomainError;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised inside the gateway client
///
/// None of these cross a task boundary: handlers log them and drop the
/// offending frame or schedule a reconnect.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Frame is not a valid envelope (missing or mistyped fields)
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Socket could not be opened or broke while in use
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound frame while no socket is open
    #[error("Not connected")]
    NotConnected,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl GatewayError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload(reason.into())
    }

    /// Get a stable error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Json(_) => "JSON_ERROR",
            Self::Domain(e) => e.code(),
        }
    }
}

impl From<GatewayError> for BotError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Domain(e) => BotError::Domain(e),
            other => BotError::Gateway(other.to_string()),
        }
    }
}
