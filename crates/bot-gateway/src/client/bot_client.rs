//! The running bot

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bot_cache::SharedCache;
use bot_common::BotConfig;
use bot_core::{
    Channel, ChannelType, CommandsConfig, Controller, DomainError, Embed, Guild, GuildMember,
    OnlineStatus, RestClient, SharedAudioSource, Snowflake, SongInfo, User,
};
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;

use super::router::BusRouter;
use crate::bus::{BusMessage, EventBus, Topic};
use crate::connection::{ConnectionEvent, GatewayConnection};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{ChannelPayload, GatewayEventType};
use crate::protocol::ActivityPayload;
use crate::replica::{Notification, StateReplica};
use crate::rest::{CreateDirectChannel, CreateMessage, GatewayBotInfo};
use crate::voice::{QueueEntry, QueueSelector, VoiceOrchestrator};

pub(crate) struct ClientInner {
    pub(crate) config: BotConfig,
    pub(crate) rest: Arc<dyn RestClient>,
    pub(crate) controller: Arc<dyn Controller>,
    pub(crate) commands: Option<Arc<dyn CommandsConfig>>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) connection: Arc<GatewayConnection>,
    pub(crate) replica: StateReplica,
    pub(crate) voice: Arc<VoiceOrchestrator>,

    events: Mutex<Option<mpsc::UnboundedReceiver<ConnectionEvent>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    pump_shutdown: Notify,
    started: AtomicBool,
    quitting: AtomicBool,
    quit_done: watch::Sender<bool>,
}

impl ClientInner {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: BotConfig,
        rest: Arc<dyn RestClient>,
        controller: Arc<dyn Controller>,
        commands: Option<Arc<dyn CommandsConfig>>,
        bus: Arc<EventBus>,
        connection: Arc<GatewayConnection>,
        replica: StateReplica,
        voice: Arc<VoiceOrchestrator>,
        events: mpsc::UnboundedReceiver<ConnectionEvent>,
    ) -> Self {
        Self {
            config,
            rest,
            controller,
            commands,
            bus,
            connection,
            replica,
            voice,
            events: Mutex::new(Some(events)),
            pump: Mutex::new(None),
            pump_shutdown: Notify::new(),
            started: AtomicBool::new(false),
            quitting: AtomicBool::new(false),
            quit_done: watch::channel(false).0,
        }
    }
}

/// Handle to a gateway bot. Cheap to clone.
#[derive(Clone)]
pub struct BotClient {
    inner: Arc<ClientInner>,
}

impl BotClient {
    pub(crate) fn from_inner(inner: ClientInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub(crate) fn from_arc(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    pub(super) fn inner_ref(&self) -> &ClientInner {
        &self.inner
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Look up the gateway endpoint, connect, and wait until the bot quits
    pub async fn run(&self) -> GatewayResult<()> {
        let info = GatewayBotInfo::fetch(self.inner.rest.as_ref()).await?;
        tracing::info!(
            shards = info.shards,
            sessions_remaining = info.session_start_limit.remaining,
            sessions_total = info.session_start_limit.total,
            "Gateway endpoint resolved"
        );

        let url = info.socket_url(self.inner.config.gateway.version);
        self.start_with_url(&url).await?;
        self.wait_for_quit().await;
        Ok(())
    }

    /// Start the background tasks and open the socket at `url`
    pub async fn start_with_url(&self, url: &str) -> GatewayResult<()> {
        self.start();
        self.inner.connection.connect(url).await
    }

    /// Start the bus dispatcher and the dispatch pump. Idempotent.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let router: Arc<BusRouter> = Arc::new(BusRouter::new(Arc::downgrade(&self.inner)));
        for topic in [Topic::QueueNextSong, Topic::Resume, Topic::Reconnect, Topic::Quit] {
            self.inner.bus.subscribe(topic, router.clone());
        }
        self.inner.bus.clone().start();

        if let Some(events) = self.inner.events.lock().take() {
            let client = self.clone();
            let handle = tokio::spawn(async move { client.pump(events).await });
            *self.inner.pump.lock() = Some(handle);
        }
    }

    async fn pump(&self, mut events: mpsc::UnboundedReceiver<ConnectionEvent>) {
        loop {
            tokio::select! {
                () = self.inner.pump_shutdown.notified() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.handle_connection_event(event).await;
                }
            }
        }
        tracing::debug!("Dispatch pump stopped");
    }

    async fn handle_connection_event(&self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Dispatch { event, data } => {
                self.handle_dispatch(event, data).await;
            }
            ConnectionEvent::Zombied => {
                tracing::warn!("Gateway stopped answering heartbeats");
                self.inner.voice.teardown_all();
                self.inner.controller.on_disconnect();
            }
            ConnectionEvent::SocketClosed { code, reason } => {
                tracing::info!(code = ?code, reason = %reason, "Gateway socket closed");
                self.inner.controller.on_disconnect();
            }
            ConnectionEvent::Fatal { code, reason } => {
                tracing::error!(code, reason = %reason, "Gateway refused the session");
                self.quit().await;
            }
        }
    }

    /// Apply a dispatch as if it had arrived on the socket, and fan the
    /// result out to voice and the controller
    pub async fn handle_dispatch(
        &self,
        event: GatewayEventType,
        data: Value,
    ) -> Option<Notification> {
        let notification = self.inner.replica.apply_event(event, data).await?;
        self.notify(&notification).await;
        Some(notification)
    }

    /// Block until a quit has completed
    pub async fn wait_for_quit(&self) {
        let mut done = self.inner.quit_done.subscribe();
        let _ = done.wait_for(|done| *done).await;
    }

    pub fn is_quitting(&self) -> bool {
        self.inner.quitting.load(Ordering::SeqCst)
    }

    /// Cooperative shutdown
    ///
    /// Leaves voice, stops the heartbeat and the socket, tears down voice
    /// connections, notifies the controller and clears every cache.
    pub async fn quit(&self) {
        if self.inner.quitting.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Shutting down");

        let guilds = self.inner.voice.connected_guilds();
        let leaves = guilds.iter().map(|&guild_id| self.inner.voice.leave(guild_id));
        for (guild_id, result) in guilds.iter().zip(join_all(leaves).await) {
            if let Err(e) = result {
                tracing::debug!(guild_id = %guild_id, error = %e, "Voice leave on quit failed");
            }
        }

        self.inner.connection.terminate();
        self.inner.voice.teardown_all();
        self.inner.controller.on_disconnect();
        self.inner.replica.cache().write().clear();
        self.inner.bus.stop();
        self.inner.pump_shutdown.notify_one();
        self.inner.controller.on_quit();
        self.inner.quit_done.send_replace(true);
        tracing::info!("Shutdown complete");
    }

    /// Post a quit through the bus, for use inside callbacks
    pub fn quit_async(&self) {
        self.inner
            .bus
            .publish(BusMessage::Quit, self.inner.config.gateway.quit_delay());
    }

    // =========================================================================
    // Presence
    // =========================================================================

    /// Set the status (unknown strings become `offline`) and AFK flag
    pub async fn set_presence(&self, status: &str, afk: bool) -> GatewayResult<()> {
        let mut presence = self.inner.connection.presence();
        presence.status = OnlineStatus::from_wire(status).as_str().to_string();
        presence.afk = afk;
        self.inner.connection.update_presence(presence).await
    }

    /// Set the activity; a url makes it a stream
    pub async fn set_activity(&self, name: &str, url: Option<&str>) -> GatewayResult<()> {
        let mut presence = self.inner.connection.presence();
        presence.game = Some(ActivityPayload::new(name, url.map(str::to_string)));
        self.inner.connection.update_presence(presence).await
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Post to a guild text channel or a DM channel
    pub async fn send_message(
        &self,
        channel: &Channel,
        text: &str,
        embed: Option<&Embed>,
        tts: bool,
    ) -> GatewayResult<()> {
        if !matches!(channel.channel_type, ChannelType::GuildText | ChannelType::Dm) {
            return Err(GatewayError::Domain(DomainError::UnsupportedChannel));
        }
        let body = CreateMessage {
            content: text,
            tts,
            embed,
        };
        let response = self
            .inner
            .rest
            .post(&CreateMessage::path(channel.id), Some(serde_json::to_value(&body)?))
            .await?;
        if !response.is_success() {
            tracing::warn!(channel_id = %channel.id, status = response.status, "Message rejected");
            return Err(response.to_error().into());
        }
        Ok(())
    }

    /// Open (or reuse) a DM channel with a user and post into it
    pub async fn send_direct_message(
        &self,
        user_id: Snowflake,
        text: &str,
        embed: Option<&Embed>,
        tts: bool,
    ) -> GatewayResult<()> {
        let body = CreateDirectChannel {
            recipient_id: user_id,
        };
        let payload: ChannelPayload = self
            .inner
            .rest
            .post(CreateDirectChannel::PATH, Some(serde_json::to_value(body)?))
            .await?
            .json()?;
        let mut channel = payload.to_channel(None);
        channel.channel_type = ChannelType::Dm;
        self.send_message(&channel, text, embed, tts).await
    }

    // =========================================================================
    // Replica accessors
    // =========================================================================

    pub fn cache(&self) -> &SharedCache {
        self.inner.replica.cache()
    }

    pub fn bot_user(&self) -> Option<User> {
        self.cache().read().bot_user().cloned()
    }

    pub fn guild(&self, guild_id: Snowflake) -> Option<Guild> {
        self.cache().read().guild(guild_id).cloned()
    }

    pub fn guild_ids(&self) -> Vec<Snowflake> {
        self.cache().read().guild_ids()
    }

    pub fn unavailable_guilds(&self) -> Vec<Snowflake> {
        self.cache().read().unavailable_ids()
    }

    pub fn channel(&self, guild_id: Snowflake, channel_id: Snowflake) -> Option<Channel> {
        self.cache().read().channel(guild_id, channel_id).cloned()
    }

    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<GuildMember> {
        self.cache().read().member(guild_id, user_id).cloned()
    }

    pub fn user(&self, user_id: Snowflake) -> Option<User> {
        self.cache().read().user(user_id).cloned()
    }

    /// The guild's owning member, if resolved
    pub fn owner(&self, guild_id: Snowflake) -> Option<GuildMember> {
        self.cache().read().guild(guild_id)?.owner().cloned()
    }

    pub fn connection(&self) -> &Arc<GatewayConnection> {
        &self.inner.connection
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.inner.bus
    }

    pub fn config(&self) -> &BotConfig {
        &self.inner.config
    }

    pub fn commands(&self) -> Option<&Arc<dyn CommandsConfig>> {
        self.inner.commands.as_ref()
    }

    // =========================================================================
    // Voice
    // =========================================================================

    pub fn voice(&self) -> &Arc<VoiceOrchestrator> {
        &self.inner.voice
    }

    pub async fn join_voice(&self, channel: &Channel) -> GatewayResult<()> {
        self.inner.voice.join(channel).await
    }

    pub async fn leave_voice(&self, guild_id: Snowflake) -> GatewayResult<()> {
        self.inner.voice.leave(guild_id).await
    }

    pub async fn start_speaking(
        &self,
        channel: &Channel,
        source: Option<SharedAudioSource>,
    ) -> GatewayResult<bool> {
        self.inner.voice.start_speaking(channel, source).await
    }

    pub fn pause_speaking(&self, guild_id: Snowflake) -> bool {
        self.inner.voice.pause_speaking(guild_id)
    }

    pub fn resume_speaking(&self, guild_id: Snowflake) -> bool {
        self.inner.voice.resume_speaking(guild_id)
    }

    pub fn stop_speaking(&self, guild_id: Snowflake) -> bool {
        self.inner.voice.stop_speaking(guild_id)
    }

    pub fn enqueue(&self, guild_id: Snowflake, source: SharedAudioSource) {
        self.inner.voice.enqueue(guild_id, source);
    }

    /// Queue a song request for the configured song resolver
    pub fn enqueue_song(&self, guild_id: Snowflake, song: SongInfo) -> GatewayResult<()> {
        self.inner.voice.enqueue_song(guild_id, song)
    }

    pub fn remove_from_queue(
        &self,
        guild_id: Snowflake,
        selector: impl Into<QueueSelector>,
    ) -> Option<QueueEntry> {
        self.inner.voice.remove_from_queue(guild_id, selector)
    }

    pub fn clear_queue(&self, guild_id: Snowflake) {
        self.inner.voice.clear_queue(guild_id);
    }

    pub fn queue(&self, guild_id: Snowflake) -> Option<Vec<QueueEntry>> {
        self.inner.voice.queue(guild_id)
    }

    pub fn audio_source(&self, guild_id: Snowflake) -> Option<SharedAudioSource> {
        self.inner.voice.audio_source(guild_id)
    }

    pub fn is_playing(&self, guild_id: Snowflake) -> bool {
        self.inner.voice.is_playing(guild_id)
    }
}

impl std::fmt::Debug for BotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotClient")
            .field("state", &self.inner.connection.state())
            .field("quitting", &self.is_quitting())
            .finish()
    }
}
