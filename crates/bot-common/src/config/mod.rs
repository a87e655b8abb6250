//! Configuration structs

mod app_config;

pub use app_config::{
    AppSettings, BotConfig, ConfigError, DiscordConfig, Environment, GatewayConfig,
    LoggingConfig, PresenceConfig, StorageConfig,
};
