//! Client construction

use std::sync::Arc;

use async_trait::async_trait;
use bot_cache::SharedCache;
use bot_common::BotConfig;
use bot_core::{
    CommandsConfig, Controller, DomainError, RepoResult, RestClient, SongResolver,
    SpeakingFinished, VoiceConnection, VoiceConnector, VoiceServerInfo,
};
use tokio::sync::mpsc;

use super::bot_client::{BotClient, ClientInner};
use crate::bus::EventBus;
use crate::connection::{ConnectionSettings, GatewayConnection, GatewayTransport, WebSocketTransport};
use crate::error::GatewayResult;
use crate::protocol::{ActivityPayload, PresenceUpdatePayload};
use crate::replica::StateReplica;
use crate::rest::HttpRestClient;
use crate::voice::VoiceOrchestrator;

/// Controller that ignores every callback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopController;

impl Controller for NoopController {}

/// Connector used when no voice transport was configured
struct NoVoice;

#[async_trait]
impl VoiceConnector for NoVoice {
    async fn connect(
        &self,
        info: VoiceServerInfo,
        _on_finished: SpeakingFinished,
    ) -> RepoResult<Arc<dyn VoiceConnection>> {
        Err(DomainError::Voice(format!(
            "no voice transport configured for guild {}",
            info.guild_id
        )))
    }
}

/// Builder for [`BotClient`]
///
/// Every collaborator has a default: the HTTPS REST client, the WebSocket
/// transport, a no-op controller and no voice transport. Song requests are
/// only accepted once a song resolver is set.
pub struct BotClientBuilder {
    config: BotConfig,
    rest: Option<Arc<dyn RestClient>>,
    transport: Option<Arc<dyn GatewayTransport>>,
    controller: Option<Arc<dyn Controller>>,
    voice_connector: Option<Arc<dyn VoiceConnector>>,
    song_resolver: Option<Arc<dyn SongResolver>>,
    commands: Option<Arc<dyn CommandsConfig>>,
}

impl BotClientBuilder {
    pub fn new(config: BotConfig) -> Self {
        Self {
            config,
            rest: None,
            transport: None,
            controller: None,
            voice_connector: None,
            song_resolver: None,
            commands: None,
        }
    }

    pub fn rest(mut self, rest: Arc<dyn RestClient>) -> Self {
        self.rest = Some(rest);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn GatewayTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn controller(mut self, controller: Arc<dyn Controller>) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn voice_connector(mut self, connector: Arc<dyn VoiceConnector>) -> Self {
        self.voice_connector = Some(connector);
        self
    }

    pub fn song_resolver(mut self, resolver: Arc<dyn SongResolver>) -> Self {
        self.song_resolver = Some(resolver);
        self
    }

    pub fn commands(mut self, commands: Arc<dyn CommandsConfig>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn build(self) -> GatewayResult<BotClient> {
        let rest: Arc<dyn RestClient> = match self.rest {
            Some(rest) => rest,
            None => Arc::new(HttpRestClient::from_config(&self.config.discord)?),
        };
        let transport: Arc<dyn GatewayTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(WebSocketTransport),
        };
        let controller: Arc<dyn Controller> = match self.controller {
            Some(controller) => controller,
            None => Arc::new(NoopController),
        };
        let voice_connector: Arc<dyn VoiceConnector> = match self.voice_connector {
            Some(connector) => connector,
            None => Arc::new(NoVoice),
        };

        let bus = Arc::new(EventBus::new());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connection = GatewayConnection::new(
            ConnectionSettings::from_config(&self.config),
            transport,
            bus.clone(),
            events_tx,
        );
        connection.set_presence(initial_presence(&self.config));

        let cache = SharedCache::default();
        let replica = StateReplica::new(cache, rest.clone());
        let mut voice = VoiceOrchestrator::new(
            connection.clone(),
            voice_connector,
            controller.clone(),
            bus.clone(),
        );
        if let Some(resolver) = self.song_resolver {
            voice = voice.with_resolver(resolver);
        }
        let voice = Arc::new(voice);

        tracing::debug!(intents = ?self.config.discord.intents, "Client built");
        Ok(BotClient::from_inner(ClientInner::new(
            self.config,
            rest,
            controller,
            self.commands,
            bus,
            connection,
            replica,
            voice,
            events_rx,
        )))
    }
}

fn initial_presence(config: &BotConfig) -> PresenceUpdatePayload {
    let mut presence = PresenceUpdatePayload::new(config.presence.status);
    presence.game = config
        .presence
        .activity
        .as_ref()
        .map(|name| ActivityPayload::new(name.clone(), config.presence.activity_url.clone()));
    presence
}
