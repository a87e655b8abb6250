//! Test helpers for integration tests
//!
//! `TestBot` builds a client whose collaborators are all in-process mocks.
//! Sockets opened by the client show up as [`Peer`]s the test can read
//! outbound frames from and push inbound frames into.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bot_common::BotConfig;
use bot_core::{
    AudioSource, Channel, Controller, DomainError, Guild, GuildAdmin, GuildMember, Message,
    MessageAction, RepoResult, RestClient, RestMethod, RestResponse, SharedAudioSource, Snowflake,
    SongInfo, SongResolver, SpeakingFinished, User, VoiceConnection, VoiceConnector,
    VoiceServerInfo,
};
use bot_gateway::connection::{GatewayTransport, Inbound, Outbound, TransportHandle};
use bot_gateway::{BotClient, BotClientBuilder, GatewayResult};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

/// Default wait for anything asynchronous in a test
pub const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// REST
// ============================================================================

/// A recorded REST call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: RestMethod,
    pub path: String,
    pub body: Option<Value>,
}

/// REST client answering from a path table; unknown paths get a 404
#[derive(Default)]
pub struct MockRestClient {
    responses: Mutex<HashMap<String, RestResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockRestClient {
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.responses
            .lock()
            .insert(path.to_string(), RestResponse::new(status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RestClient for MockRestClient {
    async fn request(
        &self,
        method: RestMethod,
        path: &str,
        body: Option<Value>,
    ) -> RepoResult<RestResponse> {
        self.requests.lock().push(RecordedRequest {
            method,
            path: path.to_string(),
            body,
        });
        Ok(self
            .responses
            .lock()
            .get(path)
            .cloned()
            .unwrap_or_else(|| RestResponse::new(404, r#"{"message": "Unknown"}"#)))
    }
}

// ============================================================================
// Socket transport
// ============================================================================

/// Server side of one socket the client opened
pub struct Peer {
    outbound: mpsc::Receiver<Outbound>,
    inbound: mpsc::Sender<Inbound>,
}

impl Peer {
    /// Push a frame to the client
    pub async fn send(&self, frame: Value) {
        let _ = self.inbound.send(Inbound::Text(frame.to_string())).await;
    }

    pub async fn hello(&self, interval_ms: u64) {
        self.send(serde_json::json!({"op": 10, "d": {"heartbeat_interval": interval_ms}}))
            .await;
    }

    pub async fn dispatch(&self, seq: u64, event: &str, data: Value) {
        self.send(serde_json::json!({"op": 0, "s": seq, "t": event, "d": data}))
            .await;
    }

    pub async fn close(&self, code: u16) {
        let _ = self
            .inbound
            .send(Inbound::Closed {
                code: Some(code),
                reason: String::new(),
            })
            .await;
    }

    /// Next frame the client wrote, text frames decoded
    pub async fn next(&mut self) -> Result<Sent> {
        match timeout(WAIT, self.outbound.recv()).await {
            Ok(Some(Outbound::Text(text))) => Ok(Sent::Frame(serde_json::from_str(&text)?)),
            Ok(Some(Outbound::Close(code))) => Ok(Sent::Close(code)),
            Ok(None) => bail!("socket dropped by client"),
            Err(_) => bail!("no frame within {WAIT:?}"),
        }
    }

    /// Next frame with the given op, skipping heartbeats
    pub async fn next_op(&mut self, op: u64) -> Result<Value> {
        loop {
            match self.next().await? {
                Sent::Frame(frame) if frame["op"] == op => return Ok(frame),
                Sent::Frame(frame) if frame["op"] == 1 => {}
                Sent::Frame(frame) => bail!("expected op {op}, got {frame}"),
                Sent::Close(code) => bail!("expected op {op}, got close {code}"),
            }
        }
    }

    /// Drain frames until a close arrives
    pub async fn next_close(&mut self) -> Result<u16> {
        loop {
            if let Sent::Close(code) = self.next().await? {
                return Ok(code);
            }
        }
    }
}

/// What the client wrote
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Frame(Value),
    Close(u16),
}

/// Transport handing each opened socket to the test as a [`Peer`]
#[derive(Default)]
pub struct MockTransport {
    peers: Mutex<Vec<Peer>>,
    urls: Mutex<Vec<String>>,
    opened: AtomicUsize,
    notify: Notify,
}

impl MockTransport {
    /// URLs of every socket opened so far
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Wait for the next socket the client opens
    pub async fn next_peer(&self) -> Result<Peer> {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                {
                    let mut peers = self.peers.lock();
                    if !peers.is_empty() {
                        return peers.remove(0);
                    }
                }
                notified.await;
            }
        };
        timeout(WAIT, wait)
            .await
            .map_err(|_| anyhow!("no socket opened within {WAIT:?}"))
    }
}

#[async_trait]
impl GatewayTransport for MockTransport {
    async fn open(&self, url: &str) -> GatewayResult<TransportHandle> {
        let (out_tx, out_rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(64);
        self.urls.lock().push(url.to_string());
        self.peers.lock().push(Peer {
            outbound: out_rx,
            inbound: in_tx,
        });
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
        Ok(TransportHandle {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

// ============================================================================
// Voice
// ============================================================================

/// Audio item identified by its title
#[derive(Debug)]
pub struct Track(pub String);

impl AudioSource for Track {
    fn title(&self) -> &str {
        &self.0
    }
}

pub fn track(title: &str) -> SharedAudioSource {
    Arc::new(Track(title.to_string()))
}

/// Voice connection recording what it was asked to play
#[derive(Default)]
pub struct MockVoiceConnection {
    pub started: Mutex<Vec<String>>,
    current: Mutex<Option<SharedAudioSource>>,
    pub disconnected: AtomicUsize,
}

impl MockVoiceConnection {
    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }
}

impl VoiceConnection for MockVoiceConnection {
    fn start_speaking(&self, source: SharedAudioSource) {
        self.started.lock().push(source.title().to_string());
        *self.current.lock() = Some(source);
    }

    fn pause_speaking(&self) {}

    fn resume_speaking(&self) {}

    fn stop_speaking(&self) {
        *self.current.lock() = None;
    }

    fn current_source(&self) -> Option<SharedAudioSource> {
        self.current.lock().clone()
    }

    fn is_speaking(&self) -> bool {
        self.current.lock().is_some()
    }

    fn disconnect(&self) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }
}

/// Connector handing out one shared [`MockVoiceConnection`]
#[derive(Default)]
pub struct MockVoiceConnector {
    pub connection: Arc<MockVoiceConnection>,
    pub infos: Mutex<Vec<VoiceServerInfo>>,
    callback: Mutex<Option<SpeakingFinished>>,
}

impl MockVoiceConnector {
    /// Simulate the current item finishing in a guild
    pub fn finish(&self, guild_id: Snowflake) -> Result<()> {
        let callback = self
            .callback
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("no voice connection opened"))?;
        callback(guild_id);
        Ok(())
    }
}

#[async_trait]
impl VoiceConnector for MockVoiceConnector {
    async fn connect(
        &self,
        info: VoiceServerInfo,
        on_finished: SpeakingFinished,
    ) -> RepoResult<Arc<dyn VoiceConnection>> {
        self.infos.lock().push(info);
        *self.callback.lock() = Some(on_finished);
        Ok(self.connection.clone())
    }
}

/// Song resolver that fails for sources named "unavailable"
#[derive(Default)]
pub struct MockSongResolver {
    pub resolved: Mutex<Vec<String>>,
}

#[async_trait]
impl SongResolver for MockSongResolver {
    async fn resolve(&self, _guild_id: Snowflake, song: SongInfo) -> RepoResult<SharedAudioSource> {
        if song.source == "unavailable" {
            return Err(DomainError::Voice(format!("cannot fetch {}", song.name)));
        }
        self.resolved.lock().push(song.name.clone());
        Ok(track(&song.name))
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Guild handler recording what it saw
#[derive(Default)]
pub struct RecordingAdmin {
    pub messages: Mutex<Vec<(MessageAction, String)>>,
    pub voice_channels: Mutex<Vec<Snowflake>>,
}

impl GuildAdmin for RecordingAdmin {
    fn on_message_event(&self, action: MessageAction, message: &Message) {
        self.messages.lock().push((action, message.content.clone()));
    }

    fn on_user_voice_state_changed(&self, channel: &Channel, _member: &GuildMember) {
        self.voice_channels.lock().push(channel.id);
    }
}

/// Controller recording callback names in order
#[derive(Default)]
pub struct RecordingController {
    calls: Mutex<Vec<String>>,
    admins: Mutex<HashMap<Snowflake, Arc<RecordingAdmin>>>,
}

impl RecordingController {
    /// Register a guild handler and return it
    pub fn admin(&self, guild_id: Snowflake) -> Arc<RecordingAdmin> {
        self.admins.lock().entry(guild_id).or_default().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().push(name.to_string());
    }
}

impl Controller for RecordingController {
    fn on_ready(&self, _bot: &User) {
        self.record("ready");
    }
    fn on_resume(&self) {
        self.record("resume");
    }
    fn on_disconnect(&self) {
        self.record("disconnect");
    }
    fn on_quit(&self) {
        self.record("quit");
    }
    fn on_guild_join(&self, _guild: &Guild) {
        self.record("guild_join");
    }
    fn on_guild_leave(&self, _guild: &Guild) {
        self.record("guild_leave");
    }
    fn on_guild_available(&self, _guild: &Guild) {
        self.record("guild_available");
    }
    fn on_guild_unavailable(&self, _guild: &Guild) {
        self.record("guild_unavailable");
    }
    fn on_member_remove(&self, _guild_id: Snowflake, _member: &GuildMember, _user: &User) {
        self.record("member_remove");
    }
    fn on_voice_state_update(
        &self,
        _guild_id: Snowflake,
        _member: &GuildMember,
        old: Option<&Channel>,
        new: Option<&Channel>,
    ) {
        let describe = |c: Option<&Channel>| c.map_or("-".to_string(), |c| c.id.to_string());
        self.record(&format!("voice:{}->{}", describe(old), describe(new)));
    }
    fn on_message(&self, _message: &Message) {
        self.record("message");
    }
    fn on_end_speaking(&self, _guild_id: Snowflake) {
        self.record("end_speaking");
    }
    fn guild_admin(&self, guild_id: Snowflake) -> Option<Arc<dyn GuildAdmin>> {
        let admin = self.admins.lock().get(&guild_id).cloned()?;
        Some(admin)
    }
}

// ============================================================================
// Bot
// ============================================================================

/// Client wired to mocks, with short gateway delays
pub struct TestBot {
    pub client: BotClient,
    pub rest: Arc<MockRestClient>,
    pub transport: Arc<MockTransport>,
    pub voice: Arc<MockVoiceConnector>,
    pub songs: Arc<MockSongResolver>,
    pub controller: Arc<RecordingController>,
}

pub fn test_config() -> BotConfig {
    let mut config = BotConfig::new("test-token");
    config.gateway.resume_delay_ms = 10;
    config.gateway.invalid_session_delay_ms = 20;
    config.gateway.heartbeat_poll_ms = 2;
    config.gateway.quit_delay_ms = 10;
    config
}

impl TestBot {
    pub fn new() -> Result<Self> {
        let rest = Arc::new(MockRestClient::default());
        let transport = Arc::new(MockTransport::default());
        let voice = Arc::new(MockVoiceConnector::default());
        let songs = Arc::new(MockSongResolver::default());
        let controller = Arc::new(RecordingController::default());

        let client = BotClientBuilder::new(test_config())
            .rest(rest.clone())
            .transport(transport.clone())
            .voice_connector(voice.clone())
            .song_resolver(songs.clone())
            .controller(controller.clone())
            .build()?;

        Ok(Self {
            client,
            rest,
            transport,
            voice,
            songs,
            controller,
        })
    }

    /// Open the gateway and return the server side of the socket
    pub async fn connect(&self) -> Result<Peer> {
        self.client.start_with_url("wss://gateway.test").await?;
        self.transport.next_peer().await
    }

    /// Connect, identify and deliver READY; returns the live socket
    pub async fn login(&self, ready: Value) -> Result<Peer> {
        let mut peer = self.connect().await?;
        peer.hello(60_000).await;
        peer.next_op(2).await?;
        peer.dispatch(1, "READY", ready).await;
        Ok(peer)
    }
}

/// Poll `check` until it holds or [`WAIT`] elapses
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
