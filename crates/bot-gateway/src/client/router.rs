//! Bus topics consumed by the client

use std::sync::Weak;

use async_trait::async_trait;

use super::bot_client::ClientInner;
use super::BotClient;
use crate::bus::{BusMessage, BusSubscriber};

/// Runs bus messages against the client, if it is still alive
pub(super) struct BusRouter {
    client: Weak<ClientInner>,
}

impl BusRouter {
    pub(super) fn new(client: Weak<ClientInner>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BusSubscriber for BusRouter {
    async fn on_message(&self, message: BusMessage) {
        let Some(inner) = self.client.upgrade() else {
            return;
        };
        match message {
            BusMessage::QueueNextSong(guild_id) => inner.voice.advance_queue(guild_id),
            BusMessage::Resume => inner.connection.resume().await,
            BusMessage::Reconnect => inner.connection.reconnect().await,
            BusMessage::Quit => BotClient::from_arc(inner).quit().await,
        }
    }
}
