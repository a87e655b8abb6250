//! Gateway connection state machine
//!
//! Owns the socket, the handshake and the heartbeat. Dispatches are handed to
//! the client through an event channel; reconnects and resumes are posted to
//! the event bus so they never run on the socket's own task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bot_common::BotConfig;
use bot_core::Intents;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;

use super::heartbeat::HeartbeatHandle;
use super::{AuthMode, ConnectionState, GatewayTransport, Inbound, Outbound, Session};
use crate::bus::{BusMessage, EventBus};
use crate::error::{GatewayError, GatewayResult};
use crate::events::GatewayEventType;
use crate::protocol::{
    CloseCode, GatewayMessage, IdentifyPayload, OpCode, PresenceUpdatePayload,
    VoiceStateUpdatePayload,
};

/// Close code used when the client drops a socket it wants to resume
const RESUMABLE_CLOSE: u16 = CloseCode::UnknownError.as_u16();

/// Close code used on quit
const NORMAL_CLOSE: u16 = 1000;

/// What the connection reports to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A dispatch for a known event type, in socket order
    Dispatch {
        event: GatewayEventType,
        data: Value,
    },
    /// Heartbeat went unacknowledged; a resume has been scheduled
    Zombied,
    /// Server closed the socket; a resume has been scheduled
    SocketClosed { code: Option<u16>, reason: String },
    /// Server closed with a code that forbids reconnecting
    Fatal { code: u16, reason: String },
}

/// Connection tunables
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub token: String,
    pub intents: Intents,
    pub resume_delay: Duration,
    pub invalid_session_delay: Duration,
    pub heartbeat_poll: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            token: config.discord.token.clone(),
            intents: config.discord.intents,
            resume_delay: config.gateway.resume_delay(),
            invalid_session_delay: config.gateway.invalid_session_delay(),
            heartbeat_poll: config.gateway.heartbeat_poll(),
        }
    }
}

/// The gateway connection
pub struct GatewayConnection {
    settings: ConnectionSettings,
    /// Opens sockets; swapped for an in-memory peer in tests
    transport: Arc<dyn GatewayTransport>,
    /// Resume and reconnect requests are posted here
    bus: Arc<EventBus>,
    /// Dispatches and socket loss, consumed by the client
    events: mpsc::UnboundedSender<ConnectionEvent>,

    state: RwLock<ConnectionState>,
    /// Session id and last sequence, kept across sockets for RESUME
    session: Mutex<Session>,
    /// Presence sent with IDENTIFY
    presence: Mutex<PresenceUpdatePayload>,
    /// URL of the last successful `connect`, reused on reconnect
    gateway_url: Mutex<Option<String>>,

    /// Writer of the current socket
    outbound: Mutex<Option<mpsc::Sender<Outbound>>>,
    /// Bumped whenever a socket is opened or abandoned; events from older
    /// sockets are ignored
    generation: AtomicU64,

    /// Milliseconds, from the last HELLO
    heartbeat_interval: AtomicU64,
    /// Cleared on each beat, set by HEARTBEAT_ACK
    heartbeat_acked: AtomicBool,
    heartbeat: Mutex<Option<HeartbeatHandle>>,

    /// Set once by `terminate`; no socket is opened afterwards
    terminated: AtomicBool,
}

impl GatewayConnection {
    /// Create a disconnected connection; nothing is opened until `connect`
    pub fn new(
        settings: ConnectionSettings,
        transport: Arc<dyn GatewayTransport>,
        bus: Arc<EventBus>,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            transport,
            bus,
            events,
            state: RwLock::new(ConnectionState::Disconnected),
            session: Mutex::new(Session::new()),
            presence: Mutex::new(PresenceUpdatePayload::default()),
            gateway_url: Mutex::new(None),
            outbound: Mutex::new(None),
            generation: AtomicU64::new(0),
            heartbeat_interval: AtomicU64::new(0),
            heartbeat_acked: AtomicBool::new(false),
            heartbeat: Mutex::new(None),
            terminated: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.lock().session_id().map(str::to_string)
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.session.lock().last_sequence()
    }

    /// Interval announced by the last HELLO
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval.load(Ordering::SeqCst))
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn presence(&self) -> PresenceUpdatePayload {
        self.presence.lock().clone()
    }

    /// Replace the presence sent with the next IDENTIFY without pushing it
    pub fn set_presence(&self, presence: PresenceUpdatePayload) {
        *self.presence.lock() = presence;
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Socket lifecycle
    // =========================================================================

    /// Open a socket to `url` and start reading from it
    pub async fn connect(self: &Arc<Self>, url: &str) -> GatewayResult<()> {
        if self.is_terminated() {
            return Err(GatewayError::NotConnected);
        }
        *self.gateway_url.lock() = Some(url.to_string());
        self.set_state(ConnectionState::Connecting);

        let handle = match self.transport.open(url).await {
            Ok(handle) => handle,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        // quit() may have run while the socket was opening
        if self.is_terminated() {
            let _ = handle.outbound.try_send(Outbound::Close(NORMAL_CLOSE));
            return Err(GatewayError::NotConnected);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.outbound.lock() = Some(handle.outbound);
        self.set_state(ConnectionState::AwaitingHello);

        let conn = self.clone();
        let mut inbound = handle.inbound;
        tokio::spawn(async move {
            while let Some(event) = inbound.recv().await {
                if conn.current_generation() != generation {
                    tracing::trace!(generation, "Ignoring event from abandoned socket");
                    continue;
                }
                conn.handle_inbound(event).await;
            }
        });

        Ok(())
    }

    /// Reopen the socket, keeping the session so the handshake resumes
    pub async fn resume(self: &Arc<Self>) {
        self.reopen(BusMessage::Resume).await;
    }

    /// Reopen the socket with a fresh session
    pub async fn reconnect(self: &Arc<Self>) {
        self.session.lock().clear();
        self.reopen(BusMessage::Reconnect).await;
    }

    async fn reopen(self: &Arc<Self>, retry: BusMessage) {
        if self.is_terminated() {
            return;
        }
        let Some(url) = self.gateway_url.lock().clone() else {
            tracing::warn!("No gateway URL to reconnect to");
            return;
        };

        self.abandon_socket(RESUMABLE_CLOSE);
        tracing::info!(url = %url, "Reconnecting to gateway");

        if let Err(e) = self.connect(&url).await {
            if self.is_terminated() {
                return;
            }
            tracing::warn!(error = %e, "Reconnect failed, retrying later");
            self.bus.publish(retry, self.settings.invalid_session_delay);
        }
    }

    /// Stop heartbeating and close the socket for good
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        self.set_state(ConnectionState::Terminating);
        self.abandon_socket(NORMAL_CLOSE);
        self.set_state(ConnectionState::Disconnected);
        tracing::info!("Gateway connection terminated");
    }

    /// Drop the current socket locally: stop its heartbeat, ask the writer
    /// to close and ignore anything the reader still delivers.
    fn abandon_socket(&self, code: u16) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.stop_heartbeat();
        if let Some(outbound) = self.outbound.lock().take() {
            let _ = outbound.try_send(Outbound::Close(code));
        }
    }

    // =========================================================================
    // Outbound frames
    // =========================================================================

    async fn send(&self, message: &GatewayMessage) -> GatewayResult<()> {
        if !message.op.is_client_op() {
            return Err(GatewayError::malformed(format!(
                "{} cannot be sent by the client",
                message.op
            )));
        }
        let json = message.encode()?;
        let sender = self
            .outbound
            .lock()
            .clone()
            .ok_or(GatewayError::NotConnected)?;
        sender
            .send(Outbound::Text(json))
            .await
            .map_err(|_| GatewayError::NotConnected)?;
        tracing::trace!(op = %message.op, "Frame sent");
        Ok(())
    }

    async fn authenticate(&self, mode: AuthMode) -> GatewayResult<()> {
        self.set_state(ConnectionState::Authenticating(mode));
        let message = match mode {
            AuthMode::Identify => {
                let identify = IdentifyPayload::new(&self.settings.token, self.settings.intents)
                    .with_presence(self.presence());
                GatewayMessage::identify(&identify)?
            }
            AuthMode::Resume => {
                let payload = self
                    .session
                    .lock()
                    .resume_payload(&self.settings.token)
                    .ok_or(GatewayError::NotConnected)?;
                GatewayMessage::resume(&payload)?
            }
        };
        self.send(&message).await?;
        tracing::info!(mode = ?mode, "Handshake sent");
        Ok(())
    }

    pub(crate) async fn send_heartbeat(&self) {
        let sequence = self.last_sequence();
        if let Err(e) = self.send(&GatewayMessage::heartbeat(sequence)).await {
            tracing::warn!(error = %e, "Failed to send heartbeat");
        } else {
            tracing::trace!(seq = ?sequence, "Heartbeat sent");
        }
    }

    /// Store the presence sent with IDENTIFY, and push it now when live
    pub async fn update_presence(&self, presence: PresenceUpdatePayload) -> GatewayResult<()> {
        self.set_presence(presence.clone());
        if self.state().is_live() {
            self.send(&GatewayMessage::presence_update(&presence)?).await?;
        }
        Ok(())
    }

    /// Ask the server to move the bot's voice state (op 4)
    pub async fn update_voice_state(&self, payload: &VoiceStateUpdatePayload) -> GatewayResult<()> {
        self.send(&GatewayMessage::voice_state_update(payload)?).await
    }

    // =========================================================================
    // Heartbeat
    // =========================================================================

    fn start_heartbeat(self: &Arc<Self>, interval: Duration) {
        self.heartbeat_acked.store(true, Ordering::SeqCst);
        let handle = HeartbeatHandle::spawn(
            Arc::downgrade(self),
            interval,
            self.settings.heartbeat_poll,
        );
        if let Some(previous) = self.heartbeat.lock().replace(handle) {
            previous.stop();
        }
    }

    fn stop_heartbeat(&self) {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.stop();
        }
    }

    /// Whether the heartbeat loop of the current socket is running
    pub fn is_heartbeating(&self) -> bool {
        self.heartbeat
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Consume the ACK flag; `false` means the last beat went unanswered
    pub(crate) fn take_heartbeat_ack(&self) -> bool {
        self.heartbeat_acked.swap(false, Ordering::SeqCst)
    }

    /// No ACK since the last beat: drop the socket and schedule a resume
    pub(crate) fn on_zombie(&self) {
        tracing::warn!("Heartbeat not acknowledged, connection is zombied");
        // Called from the heartbeat task itself; only detach its handle
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.heartbeat.lock().take();
        if let Some(outbound) = self.outbound.lock().take() {
            let _ = outbound.try_send(Outbound::Close(RESUMABLE_CLOSE));
        }
        self.set_state(ConnectionState::Disconnected);

        if self.is_terminated() {
            return;
        }
        let _ = self.events.send(ConnectionEvent::Zombied);
        self.bus.publish(BusMessage::Resume, self.settings.resume_delay);
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    async fn handle_inbound(self: &Arc<Self>, event: Inbound) {
        match event {
            Inbound::Text(text) => self.handle_frame(&text).await,
            Inbound::Closed { code, reason } => self.handle_close(code, reason),
            Inbound::Error(error) => tracing::warn!(error = %error, "WebSocket error"),
        }
    }

    /// Process one text frame from the current socket
    pub async fn handle_frame(self: &Arc<Self>, frame: &str) {
        let message = match GatewayMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping frame");
                return;
            }
        };

        if !message.op.is_server_op() {
            tracing::debug!(op = %message.op, "Ignoring client-only op from server");
            return;
        }

        match message.op {
            OpCode::Dispatch => self.handle_dispatch(message),
            OpCode::Hello => self.handle_hello(&message).await,
            OpCode::HeartbeatAck => {
                self.heartbeat_acked.store(true, Ordering::SeqCst);
                tracing::trace!("Heartbeat acknowledged");
            }
            OpCode::Heartbeat => self.send_heartbeat().await,
            OpCode::InvalidSession => {
                let resumable = message.as_invalid_session().unwrap_or(false);
                self.handle_invalid_session(resumable).await;
            }
            OpCode::Reconnect => {
                tracing::info!("Server requested reconnect");
                self.session.lock().clear();
                self.abandon_socket(RESUMABLE_CLOSE);
                self.set_state(ConnectionState::Disconnected);
                self.bus.publish(BusMessage::Reconnect, Duration::ZERO);
            }
            OpCode::Identify
            | OpCode::PresenceUpdate
            | OpCode::VoiceStateUpdate
            | OpCode::Resume
            | OpCode::RequestGuildMembers => {}
        }
    }

    fn handle_dispatch(&self, message: GatewayMessage) {
        if let Some(sequence) = message.s {
            self.session.lock().record_sequence(sequence);
        }
        let Some(name) = message.t else { return };
        let Some(event) = GatewayEventType::from_name(&name) else {
            tracing::trace!(event = %name, "Unhandled dispatch");
            return;
        };
        let data = message.d.unwrap_or(Value::Null);

        if event == GatewayEventType::Ready {
            match data.get("session_id").and_then(Value::as_str) {
                Some(session_id) => self.session.lock().set_session_id(session_id),
                None => tracing::warn!("READY without session id"),
            }
        }

        tracing::trace!(event = %event, "Dispatch received");
        let _ = self.events.send(ConnectionEvent::Dispatch { event, data });
    }

    async fn handle_hello(self: &Arc<Self>, message: &GatewayMessage) {
        let hello = match message.as_hello() {
            Ok(hello) => hello,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping frame");
                return;
            }
        };
        self.heartbeat_interval
            .store(hello.heartbeat_interval, Ordering::SeqCst);

        let mode = if self.session.lock().can_resume() {
            AuthMode::Resume
        } else {
            self.session.lock().clear();
            AuthMode::Identify
        };

        if let Err(e) = self.authenticate(mode).await {
            tracing::warn!(error = %e, "Failed to send handshake");
            return;
        }

        // Live as soon as the handshake is out; liveness starts now
        self.start_heartbeat(Duration::from_millis(hello.heartbeat_interval));
        self.set_state(ConnectionState::Live);
    }

    async fn handle_invalid_session(self: &Arc<Self>, resumable: bool) {
        if resumable {
            tracing::info!("Session invalidated, resuming on the same socket");
            if let Err(e) = self.authenticate(AuthMode::Resume).await {
                tracing::warn!(error = %e, "Failed to send resume");
                return;
            }
            self.set_state(ConnectionState::Live);
        } else {
            tracing::info!(
                delay_ms = self.settings.invalid_session_delay.as_millis() as u64,
                "Session invalidated, reconnecting"
            );
            self.session.lock().clear();
            self.abandon_socket(RESUMABLE_CLOSE);
            self.set_state(ConnectionState::Disconnected);
            self.bus
                .publish(BusMessage::Reconnect, self.settings.invalid_session_delay);
        }
    }

    fn handle_close(&self, code: Option<u16>, reason: String) {
        self.stop_heartbeat();
        self.outbound.lock().take();
        self.set_state(ConnectionState::Disconnected);

        if self.is_terminated() {
            return;
        }

        let known = code.and_then(CloseCode::from_u16);
        if let Some(close) = known {
            if !close.should_reconnect() {
                tracing::error!(code = %close, reason = %reason, "Gateway closed the connection for good");
                let _ = self.events.send(ConnectionEvent::Fatal {
                    code: close.as_u16(),
                    reason,
                });
                return;
            }
            if close.invalidates_session() {
                self.session.lock().clear();
            }
        }

        tracing::warn!(code = ?code, reason = %reason, "WebSocket closed, resuming");
        let _ = self.events.send(ConnectionEvent::SocketClosed { code, reason });
        self.bus.publish(BusMessage::Resume, self.settings.resume_delay);
    }
}

impl Drop for GatewayConnection {
    fn drop(&mut self) {
        if let Some(handle) = self.heartbeat.get_mut().take() {
            handle.stop();
        }
    }
}
