//! Bot configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use bot_core::{Intents, OnlineStatus};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub app: AppSettings,
    pub discord: DiscordConfig,
    pub gateway: GatewayConfig,
    pub presence: PresenceConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Credentials and REST settings
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub intents: Intents,
    /// REST base URL, without trailing slash
    pub api_base_url: String,
    pub user_agent: String,
    pub rest_timeout_secs: u64,
}

impl DiscordConfig {
    pub fn rest_timeout(&self) -> Duration {
        Duration::from_secs(self.rest_timeout_secs)
    }
}

/// Gateway protocol and recovery timing
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub version: u8,
    /// Delay before a resume requested by the liveness monitor or a socket close
    pub resume_delay_ms: u64,
    /// Delay before reconnecting after a non-resumable INVALID_SESSION
    pub invalid_session_delay_ms: u64,
    /// Granularity at which the heartbeat wait checks for termination
    pub heartbeat_poll_ms: u64,
    /// Delay applied by `quit_async`
    pub quit_delay_ms: u64,
}

impl GatewayConfig {
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    pub fn invalid_session_delay(&self) -> Duration {
        Duration::from_millis(self.invalid_session_delay_ms)
    }

    pub fn heartbeat_poll(&self) -> Duration {
        Duration::from_millis(self.heartbeat_poll_ms.max(1))
    }

    pub fn quit_delay(&self) -> Duration {
        Duration::from_millis(self.quit_delay_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: default_gateway_version(),
            resume_delay_ms: default_resume_delay_ms(),
            invalid_session_delay_ms: default_invalid_session_delay_ms(),
            heartbeat_poll_ms: default_heartbeat_poll_ms(),
            quit_delay_ms: default_quit_delay_ms(),
        }
    }
}

/// Presence announced with IDENTIFY
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub status: OnlineStatus,
    pub activity: Option<String>,
    pub activity_url: Option<String>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            status: OnlineStatus::Online,
            activity: None,
            activity_url: None,
        }
    }
}

/// Flat-file storage for command preferences
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub commands_db_path: PathBuf,
    pub prefixes_db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            commands_db_path: PathBuf::from(default_commands_db_path()),
            prefixes_db_path: PathBuf::from(default_prefixes_db_path()),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

// Default value functions
fn default_app_name() -> String {
    "gatebot".to_string()
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v8".to_string()
}

fn default_user_agent() -> String {
    format!(
        "gatebot (https://github.com/seung/gatebot, {})",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_rest_timeout_secs() -> u64 {
    30
}

fn default_gateway_version() -> u8 {
    8
}

fn default_resume_delay_ms() -> u64 {
    100
}

fn default_invalid_session_delay_ms() -> u64 {
    5000
}

fn default_heartbeat_poll_ms() -> u64 {
    10
}

fn default_quit_delay_ms() -> u64 {
    200
}

fn default_commands_db_path() -> String {
    "databs.json".to_string()
}

fn default_prefixes_db_path() -> String {
    "databs_prefixes.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BotConfig {
    /// Configuration with every default applied and the given token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: Environment::default(),
            },
            discord: DiscordConfig {
                token: token.into(),
                intents: Intents::default(),
                api_base_url: default_api_base_url(),
                user_agent: default_user_agent(),
                rest_timeout_secs: default_rest_timeout_secs(),
            },
            gateway: GatewayConfig::default(),
            presence: PresenceConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
                json: false,
            },
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `DISCORD_TOKEN` is missing or a value does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;

        let mut config = Self::new(token);

        if let Some(name) = lookup("APP_NAME") {
            config.app.name = name;
        }
        if let Some(value) = lookup("APP_ENV") {
            config.app.env = Environment::parse(&value)
                .ok_or(ConfigError::InvalidValue("APP_ENV", value))?;
        }

        if let Some(bits) = parse_var::<u64, _>(&lookup, "BOT_INTENTS")? {
            config.discord.intents = Intents::from_bits_truncate(bits);
        }
        if let Some(url) = lookup("DISCORD_API_BASE_URL") {
            config.discord.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(agent) = lookup("REST_USER_AGENT") {
            config.discord.user_agent = agent;
        }
        if let Some(secs) = parse_var(&lookup, "REST_TIMEOUT_SECS")? {
            config.discord.rest_timeout_secs = secs;
        }

        if let Some(version) = parse_var(&lookup, "GATEWAY_VERSION")? {
            config.gateway.version = version;
        }
        if let Some(ms) = parse_var(&lookup, "GATEWAY_RESUME_DELAY_MS")? {
            config.gateway.resume_delay_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "GATEWAY_INVALID_SESSION_DELAY_MS")? {
            config.gateway.invalid_session_delay_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "GATEWAY_HEARTBEAT_POLL_MS")? {
            config.gateway.heartbeat_poll_ms = ms;
        }
        if let Some(ms) = parse_var(&lookup, "BOT_QUIT_DELAY_MS")? {
            config.gateway.quit_delay_ms = ms;
        }

        if let Some(status) = lookup("BOT_STATUS") {
            config.presence.status = OnlineStatus::from_wire(&status);
        }
        config.presence.activity = lookup("BOT_ACTIVITY").filter(|s| !s.is_empty());
        config.presence.activity_url = lookup("BOT_ACTIVITY_URL").filter(|s| !s.is_empty());

        if let Some(path) = lookup("COMMANDS_DB_PATH") {
            config.storage.commands_db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("PREFIXES_DB_PATH") {
            config.storage.prefixes_db_path = PathBuf::from(path);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.logging.level = level;
        }
        config.logging.json = lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"))
            || (config.app.env.is_production() && lookup("LOG_FORMAT").is_none());

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
