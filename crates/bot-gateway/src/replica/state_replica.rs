//! Event application front door

use std::sync::Arc;

use bot_cache::SharedCache;
use bot_core::{MessageAction, RestClient, Snowflake};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::handlers::{
    ChannelHandler, GuildHandler, MemberHandler, MessageHandler, PresenceHandler, VoiceHandler,
};
use super::Notification;
use crate::error::{GatewayError, GatewayResult};
use crate::events::{GatewayEventType, MemberPayload};

/// Builds and mutates the cached object graph from dispatches
///
/// Events are applied one at a time in socket order. The cache lock is only
/// held inside synchronous sections, never across a REST call.
pub struct StateReplica {
    cache: SharedCache,
    rest: Arc<dyn RestClient>,
}

impl StateReplica {
    pub fn new(cache: SharedCache, rest: Arc<dyn RestClient>) -> Self {
        Self { cache, rest }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Apply one dispatch. Malformed bodies are logged and dropped without
    /// touching the cache; references to unknown entities are skipped.
    pub async fn apply_event(&self, event: GatewayEventType, data: Value) -> Option<Notification> {
        let result = match event {
            GatewayEventType::Ready => GuildHandler::ready(self, data),
            GatewayEventType::Resumed => Ok(Some(Notification::Resumed)),
            GatewayEventType::GuildCreate => GuildHandler::create(self, data).await,
            GatewayEventType::GuildDelete => GuildHandler::delete(self, data),
            GatewayEventType::ChannelCreate => ChannelHandler::upsert(self, data, true),
            GatewayEventType::ChannelUpdate => ChannelHandler::upsert(self, data, false),
            GatewayEventType::ChannelDelete => ChannelHandler::delete(self, data),
            GatewayEventType::GuildMemberAdd => MemberHandler::add(self, data),
            GatewayEventType::GuildMemberUpdate => MemberHandler::update(self, data),
            GatewayEventType::GuildMemberRemove => MemberHandler::remove(self, data, false),
            GatewayEventType::GuildBanAdd => MemberHandler::remove(self, data, true),
            GatewayEventType::PresenceUpdate => PresenceHandler::handle(self, data).await,
            GatewayEventType::VoiceStateUpdate => VoiceHandler::state_update(self, data),
            GatewayEventType::VoiceServerUpdate => VoiceHandler::server_update(self, data),
            GatewayEventType::MessageCreate => {
                MessageHandler::handle(self, data, MessageAction::Create).await
            }
            GatewayEventType::MessageUpdate => {
                MessageHandler::handle(self, data, MessageAction::Edit).await
            }
            GatewayEventType::MessageDelete => {
                MessageHandler::handle(self, data, MessageAction::Delete).await
            }
        };

        match result {
            Ok(Some(notification)) => {
                tracing::trace!(event = %event, kind = notification.kind(), "Event applied");
                Some(notification)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(event = %event, code = e.error_code(), error = %e, "Event dropped");
                None
            }
        }
    }

    /// Fetch a member the cache does not hold yet
    pub(crate) async fn fetch_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> Option<MemberPayload> {
        let path = format!("/guilds/{guild_id}/members/{user_id}");
        let response = match self.rest.get(&path).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(guild_id = %guild_id, user_id = %user_id, error = %e, "Member fetch failed");
                return None;
            }
        };
        match response.json::<MemberPayload>() {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(
                    guild_id = %guild_id,
                    user_id = %user_id,
                    status = response.status,
                    error = %e,
                    "Member fetch rejected"
                );
                None
            }
        }
    }
}

/// Decode an event body
pub(super) fn parse<T: DeserializeOwned>(data: Value) -> GatewayResult<T> {
    serde_json::from_value(data).map_err(GatewayError::from)
}
