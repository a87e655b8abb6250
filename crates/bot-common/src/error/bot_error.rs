//! Top-level error type
//!
//! Everything that can stop the bot from starting or running ends up here.

use bot_core::DomainError;

use crate::config::ConfigError;
use crate::telemetry::TracingError;

pub type BotResult<T> = Result<T, BotError>;

/// Bot-wide error type
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TracingError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl BotError {
    /// Get a stable error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Telemetry(_) => "TELEMETRY_ERROR",
            Self::Domain(e) => e.code(),
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether retrying the failed operation later could succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Domain(DomainError::Transport(_)) | Self::Gateway(_) => true,
            Self::Domain(DomainError::Http { status, .. }) => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Internal(err.into())
    }
}
