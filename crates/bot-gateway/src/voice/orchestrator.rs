//! Voice and queue orchestration
//!
//! Tracks at most one voice connection and one playback queue per guild, and
//! bridges the gateway's voice handshake (op 4, then VOICE_SERVER_UPDATE) to
//! the external voice transport. Queued song requests are handed to a
//! [`SongResolver`] when they reach the head of the queue; the prepared audio
//! is started by [`VoiceOrchestrator::on_song_prepared`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bot_core::{
    Channel, Controller, DomainError, RepoResult, SharedAudioSource, Snowflake, SongInfo,
    SongResolver, SpeakingFinished, VoiceConnection, VoiceConnector, VoiceServerInfo,
};
use parking_lot::Mutex;

use super::{PlaybackQueue, QueueEntry, QueueSelector};
use crate::bus::{BusMessage, EventBus};
use crate::connection::GatewayConnection;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::VoiceStateUpdatePayload;

#[derive(Default)]
struct VoiceRegistry {
    connections: HashMap<Snowflake, Arc<dyn VoiceConnection>>,
    queues: HashMap<Snowflake, PlaybackQueue>,
    /// Item to start once the guild's connection comes up
    pending: HashMap<Snowflake, SharedAudioSource>,
    /// Guilds with a song request in the resolver; cleared on teardown so a
    /// late result is dropped
    preparing: HashSet<Snowflake>,
}

/// Per-guild voice connections and playback queues
///
/// Connection methods are never invoked while the registry lock is held; a
/// transport that reports completion synchronously would otherwise deadlock.
pub struct VoiceOrchestrator {
    /// Carries op 4 join and leave requests
    gateway: Arc<GatewayConnection>,
    /// Opens the audio transport once a voice server is known
    connector: Arc<dyn VoiceConnector>,
    /// Told when an item finished playing
    controller: Arc<dyn Controller>,
    /// Queue advances are posted here
    bus: Arc<EventBus>,
    /// Turns queued song requests into audio; without one they are rejected
    resolver: Option<Arc<dyn SongResolver>>,
    registry: Arc<Mutex<VoiceRegistry>>,
}

impl VoiceOrchestrator {
    /// Create an orchestrator with no connections and no queues
    pub fn new(
        gateway: Arc<GatewayConnection>,
        connector: Arc<dyn VoiceConnector>,
        controller: Arc<dyn Controller>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            gateway,
            connector,
            controller,
            bus,
            resolver: None,
            registry: Arc::new(Mutex::new(VoiceRegistry::default())),
        }
    }

    /// Accept song requests, prepared by `resolver`
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn SongResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    // =========================================================================
    // Gateway requests
    // =========================================================================

    /// Ask the gateway to move the bot into a voice channel
    pub async fn join(&self, channel: &Channel) -> GatewayResult<()> {
        let guild_id = channel
            .guild_id
            .ok_or(GatewayError::Domain(DomainError::UnsupportedChannel))?;
        tracing::info!(guild_id = %guild_id, channel_id = %channel.id, "Joining voice channel");
        self.gateway
            .update_voice_state(&VoiceStateUpdatePayload::join(guild_id, channel.id))
            .await
    }

    /// Ask the gateway to take the bot out of voice in a guild
    pub async fn leave(&self, guild_id: Snowflake) -> GatewayResult<()> {
        tracing::info!(guild_id = %guild_id, "Leaving voice");
        self.gateway
            .update_voice_state(&VoiceStateUpdatePayload::leave(guild_id))
            .await
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Start audio in a channel's guild
    ///
    /// With no explicit source the next queued item is used; an exhausted
    /// queue is cleared and nothing starts. Without a live connection the
    /// source is held and the bot joins `channel`. Returns whether something
    /// was started or scheduled.
    pub async fn start_speaking(
        &self,
        channel: &Channel,
        source: Option<SharedAudioSource>,
    ) -> GatewayResult<bool> {
        let guild_id = channel
            .guild_id
            .ok_or(GatewayError::Domain(DomainError::UnsupportedChannel))?;

        let (entry, connection) = {
            let mut registry = self.registry.lock();
            let entry = match source {
                Some(source) => QueueEntry::Ready(source),
                None => match take_next(&mut registry, guild_id) {
                    Some(next) => next,
                    None => return Ok(false),
                },
            };
            let connection = registry.connections.get(&guild_id).cloned();
            if let (None, QueueEntry::Ready(source)) = (&connection, &entry) {
                registry.pending.insert(guild_id, source.clone());
            }
            (entry, connection)
        };

        match (entry, connection) {
            (QueueEntry::Ready(source), Some(connection)) => {
                tracing::debug!(guild_id = %guild_id, title = source.title(), "Starting playback");
                connection.start_speaking(source);
                return Ok(true);
            }
            (QueueEntry::Requested(song), connection) => {
                self.prepare(guild_id, song);
                if connection.is_some() {
                    return Ok(true);
                }
            }
            (QueueEntry::Ready(_), None) => {}
        }

        if let Err(e) = self.join(channel).await {
            let mut registry = self.registry.lock();
            registry.pending.remove(&guild_id);
            registry.preparing.remove(&guild_id);
            return Err(e);
        }
        Ok(true)
    }

    /// Pause the current item; false when the guild has no connection
    pub fn pause_speaking(&self, guild_id: Snowflake) -> bool {
        self.with_connection(guild_id, |c| c.pause_speaking())
    }

    pub fn resume_speaking(&self, guild_id: Snowflake) -> bool {
        self.with_connection(guild_id, |c| c.resume_speaking())
    }

    pub fn stop_speaking(&self, guild_id: Snowflake) -> bool {
        self.with_connection(guild_id, |c| c.stop_speaking())
    }

    /// Item loaded on the guild's connection, paused or playing
    pub fn audio_source(&self, guild_id: Snowflake) -> Option<SharedAudioSource> {
        self.connection(guild_id)?.current_source()
    }

    pub fn is_playing(&self, guild_id: Snowflake) -> bool {
        self.audio_source(guild_id).is_some()
    }

    pub fn connection(&self, guild_id: Snowflake) -> Option<Arc<dyn VoiceConnection>> {
        self.registry.lock().connections.get(&guild_id).cloned()
    }

    pub fn has_connection(&self, guild_id: Snowflake) -> bool {
        self.registry.lock().connections.contains_key(&guild_id)
    }

    /// Guilds with an open voice connection
    pub fn connected_guilds(&self) -> Vec<Snowflake> {
        self.registry.lock().connections.keys().copied().collect()
    }

    fn with_connection(&self, guild_id: Snowflake, f: impl FnOnce(&dyn VoiceConnection)) -> bool {
        match self.connection(guild_id) {
            Some(connection) => {
                f(connection.as_ref());
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Append an item, creating the guild's queue on first use
    pub fn enqueue(&self, guild_id: Snowflake, source: SharedAudioSource) {
        tracing::debug!(guild_id = %guild_id, title = source.title(), "Queued");
        self.registry
            .lock()
            .queues
            .entry(guild_id)
            .or_insert_with(|| PlaybackQueue::new(guild_id))
            .push(source);
    }

    /// Append a song request; it is resolved when it reaches the head
    pub fn enqueue_song(&self, guild_id: Snowflake, song: SongInfo) -> GatewayResult<()> {
        if self.resolver.is_none() {
            return Err(GatewayError::Domain(DomainError::Voice(
                "no song resolver configured".to_string(),
            )));
        }
        tracing::debug!(guild_id = %guild_id, name = %song.name, "Song requested");
        self.registry
            .lock()
            .queues
            .entry(guild_id)
            .or_insert_with(|| PlaybackQueue::new(guild_id))
            .push(song);
        Ok(())
    }

    /// Remove one queued item by position or title
    pub fn remove_from_queue(
        &self,
        guild_id: Snowflake,
        selector: impl Into<QueueSelector>,
    ) -> Option<QueueEntry> {
        let selector = selector.into();
        self.registry
            .lock()
            .queues
            .get_mut(&guild_id)?
            .remove(&selector)
    }

    /// Empty the guild's queue, keeping the queue itself
    pub fn clear_queue(&self, guild_id: Snowflake) {
        if let Some(queue) = self.registry.lock().queues.get_mut(&guild_id) {
            queue.clear();
        }
    }

    /// Snapshot of the queued items, in play order
    pub fn queue(&self, guild_id: Snowflake) -> Option<Vec<QueueEntry>> {
        self.registry
            .lock()
            .queues
            .get(&guild_id)
            .map(|queue| queue.iter().cloned().collect())
    }

    pub fn has_queue(&self, guild_id: Snowflake) -> bool {
        self.registry.lock().queues.contains_key(&guild_id)
    }

    /// Start the next queued item on the guild's connection
    ///
    /// Runs when the previous item finished. An exhausted queue is cleared;
    /// an item taken while no connection exists is dropped. A song request is
    /// handed to the resolver and starts once prepared.
    pub fn advance_queue(&self, guild_id: Snowflake) {
        let (next, connection) = {
            let mut registry = self.registry.lock();
            let next = take_next(&mut registry, guild_id);
            (next, registry.connections.get(&guild_id).cloned())
        };
        match (next, connection) {
            (Some(QueueEntry::Requested(song)), _) => self.prepare(guild_id, song),
            (Some(QueueEntry::Ready(next)), Some(connection)) => {
                tracing::debug!(guild_id = %guild_id, title = next.title(), "Advancing queue");
                connection.start_speaking(next);
            }
            (Some(QueueEntry::Ready(next)), None) => {
                tracing::debug!(guild_id = %guild_id, title = next.title(), "No voice connection, queued item dropped");
            }
            (None, _) => {
                tracing::trace!(guild_id = %guild_id, "Queue exhausted");
            }
        }
    }

    /// Resolve a song request off the caller's task
    fn prepare(&self, guild_id: Snowflake, song: SongInfo) {
        let Some(resolver) = self.resolver.clone() else {
            tracing::warn!(guild_id = %guild_id, name = %song.name, "No song resolver, skipping request");
            self.bus.publish(BusMessage::QueueNextSong(guild_id), Duration::ZERO);
            return;
        };
        self.registry.lock().preparing.insert(guild_id);
        tracing::debug!(guild_id = %guild_id, name = %song.name, "Preparing song");

        let registry = self.registry.clone();
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let prepared = resolver.resolve(guild_id, song).await;
            song_prepared(&registry, &bus, guild_id, prepared);
        });
    }

    /// A song request finished preparing
    ///
    /// The audio starts on the guild's connection, or is held until one comes
    /// up. A failed preparation skips to the next item. Results for a guild
    /// whose voice was torn down meanwhile are dropped.
    pub fn on_song_prepared(&self, guild_id: Snowflake, prepared: RepoResult<SharedAudioSource>) {
        song_prepared(&self.registry, &self.bus, guild_id, prepared);
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Open the voice transport once the gateway handed out a voice server
    ///
    /// Creates the guild's queue if needed and starts any held source.
    pub async fn establish(&self, info: VoiceServerInfo) -> GatewayResult<()> {
        let guild_id = info.guild_id;
        tracing::info!(guild_id = %guild_id, endpoint = ?info.endpoint, "Opening voice connection");

        let connection = self
            .connector
            .connect(info, self.finished_callback())
            .await?;

        let (previous, pending) = {
            let mut registry = self.registry.lock();
            let previous = registry.connections.insert(guild_id, connection.clone());
            registry
                .queues
                .entry(guild_id)
                .or_insert_with(|| PlaybackQueue::new(guild_id));
            (previous, registry.pending.remove(&guild_id))
        };

        if let Some(previous) = previous {
            previous.disconnect();
        }
        if let Some(source) = pending {
            tracing::debug!(guild_id = %guild_id, title = source.title(), "Starting held source");
            connection.start_speaking(source);
        }
        Ok(())
    }

    /// Drop the guild's connection, queue and held source
    pub fn teardown(&self, guild_id: Snowflake) -> bool {
        let (connection, had_queue) = {
            let mut registry = self.registry.lock();
            registry.pending.remove(&guild_id);
            registry.preparing.remove(&guild_id);
            (
                registry.connections.remove(&guild_id),
                registry.queues.remove(&guild_id).is_some(),
            )
        };
        let had_connection = connection.is_some();
        if let Some(connection) = connection {
            connection.disconnect();
        }
        if had_connection || had_queue {
            tracing::info!(guild_id = %guild_id, "Voice torn down");
        }
        had_connection || had_queue
    }

    /// Drop every connection, queue and held source
    pub fn teardown_all(&self) {
        let connections: Vec<_> = {
            let mut registry = std::mem::take(&mut *self.registry.lock());
            registry.connections.drain().map(|(_, c)| c).collect()
        };
        for connection in connections {
            connection.disconnect();
        }
    }

    /// Current item finished: advance through the bus and tell the controller
    pub fn on_speaking_finished(&self, guild_id: Snowflake) {
        finished(&self.bus, self.controller.as_ref(), guild_id);
    }

    fn finished_callback(&self) -> SpeakingFinished {
        let bus = self.bus.clone();
        let controller = self.controller.clone();
        Arc::new(move |guild_id| finished(&bus, controller.as_ref(), guild_id))
    }
}

fn finished(bus: &EventBus, controller: &dyn Controller, guild_id: Snowflake) {
    tracing::debug!(guild_id = %guild_id, "Playback finished");
    bus.publish(BusMessage::QueueNextSong(guild_id), Duration::ZERO);
    controller.on_end_speaking(guild_id);
}

fn song_prepared(
    registry: &Mutex<VoiceRegistry>,
    bus: &EventBus,
    guild_id: Snowflake,
    prepared: RepoResult<SharedAudioSource>,
) {
    let (connection, source) = {
        let mut registry = registry.lock();
        if !registry.preparing.remove(&guild_id) {
            tracing::debug!(guild_id = %guild_id, "Voice gone while preparing, song dropped");
            return;
        }
        let source = match prepared {
            Ok(source) => source,
            Err(e) => {
                drop(registry);
                tracing::warn!(guild_id = %guild_id, error = %e, "Song preparation failed, skipping");
                bus.publish(BusMessage::QueueNextSong(guild_id), Duration::ZERO);
                return;
            }
        };
        let Some(connection) = registry.connections.get(&guild_id).cloned() else {
            tracing::debug!(guild_id = %guild_id, title = source.title(), "Song prepared, waiting for voice");
            registry.pending.insert(guild_id, source);
            return;
        };
        (connection, source)
    };
    tracing::debug!(guild_id = %guild_id, title = source.title(), "Starting prepared song");
    connection.start_speaking(source);
}

/// Pop the guild's next item, clearing the queue when it is exhausted
fn take_next(registry: &mut VoiceRegistry, guild_id: Snowflake) -> Option<QueueEntry> {
    let queue = registry.queues.get_mut(&guild_id)?;
    let next = queue.next();
    if next.is_none() {
        queue.clear();
    }
    next
}
