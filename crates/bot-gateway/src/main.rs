//! Gateway bot entry point
//!
//! Run with:
//! ```bash
//! cargo run -p bot-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use std::sync::Arc;

use anyhow::Context;
use bot_cache::JsonCommandsConfig;
use bot_common::{try_init_tracing_with_config, BotConfig, TracingConfig};
use bot_core::{Controller, Guild, GuildMember, Message, Snowflake, User};
use bot_gateway::BotClientBuilder;
use tracing::{error, info};

/// Controller that reports gateway activity to the log
struct LoggingController;

impl Controller for LoggingController {
    fn on_ready(&self, bot: &User) {
        info!(user = %bot.tag(), "Logged in");
    }

    fn on_resume(&self) {
        info!("Resumed");
    }

    fn on_disconnect(&self) {
        info!("Disconnected");
    }

    fn on_quit(&self) {
        info!("Quit");
    }

    fn on_guild_join(&self, guild: &Guild) {
        info!(guild_id = %guild.id, name = %guild.name, "Joined guild");
    }

    fn on_guild_leave(&self, guild: &Guild) {
        info!(guild_id = %guild.id, name = %guild.name, "Left guild");
    }

    fn on_guild_available(&self, guild: &Guild) {
        info!(guild_id = %guild.id, members = guild.members.len(), "Guild available");
    }

    fn on_guild_unavailable(&self, guild: &Guild) {
        info!(guild_id = %guild.id, "Guild unavailable");
    }

    fn on_member_add(&self, guild_id: Snowflake, _member: &GuildMember, user: &User) {
        info!(guild_id = %guild_id, user = %user.tag(), "Member joined");
    }

    fn on_message(&self, message: &Message) {
        tracing::debug!(
            channel_id = %message.channel.id,
            author = ?message.author.as_ref().map(User::tag),
            "Message"
        );
    }

    fn on_end_speaking(&self, guild_id: Snowflake) {
        tracing::debug!(guild_id = %guild_id, "Playback finished");
    }
}

#[tokio::main]
async fn main() {
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::from_logging(&config.logging)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Bot stopped with an error");
        std::process::exit(1);
    }
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    info!(env = ?config.app.env, name = %config.app.name, "Starting gateway bot");

    let commands = JsonCommandsConfig::open(
        &config.storage.commands_db_path,
        &config.storage.prefixes_db_path,
    )
    .context("loading command preferences")?;

    let client = BotClientBuilder::new(config)
        .controller(Arc::new(LoggingController))
        .commands(Arc::new(commands))
        .build()
        .context("building client")?;

    let signal_client = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            signal_client.quit().await;
        }
    });

    client.run().await.context("gateway session")?;
    Ok(())
}
