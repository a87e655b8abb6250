//! CHANNEL_CREATE, CHANNEL_UPDATE and CHANNEL_DELETE

use serde_json::Value;

use super::super::state_replica::parse;
use super::super::{Notification, StateReplica};
use crate::error::GatewayResult;
use crate::events::ChannelPayload;

pub struct ChannelHandler;

impl ChannelHandler {
    /// Create or replace a guild channel. DM channels are not cached.
    pub fn upsert(
        replica: &StateReplica,
        data: Value,
        created: bool,
    ) -> GatewayResult<Option<Notification>> {
        let payload: ChannelPayload = parse(data)?;
        let channel = payload.to_channel(None);
        if channel.guild_id.is_none() {
            tracing::trace!(channel_id = %channel.id, "Ignoring private channel");
            return Ok(None);
        }

        if !replica.cache().write().upsert_channel(channel.clone()) {
            tracing::debug!(channel_id = %channel.id, guild_id = ?channel.guild_id, "Channel for unknown guild");
            return Ok(None);
        }

        Ok(Some(if created {
            Notification::ChannelCreated(channel)
        } else {
            Notification::ChannelUpdated(channel)
        }))
    }

    pub fn delete(replica: &StateReplica, data: Value) -> GatewayResult<Option<Notification>> {
        let payload: ChannelPayload = parse(data)?;
        let Some(guild_id) = payload.guild_id else {
            return Ok(None);
        };
        let removed = replica.cache().write().remove_channel(guild_id, payload.id);
        if removed.is_none() {
            tracing::debug!(channel_id = %payload.id, guild_id = %guild_id, "Delete for unknown channel");
        }
        Ok(removed.map(Notification::ChannelDeleted))
    }
}
