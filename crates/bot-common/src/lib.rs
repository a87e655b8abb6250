//! # bot-common
//!
//! Shared utilities including configuration, error handling, and telemetry.

pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    AppSettings, BotConfig, ConfigError, DiscordConfig, Environment, GatewayConfig,
    LoggingConfig, PresenceConfig, StorageConfig,
};
pub use error::{BotError, BotResult};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
