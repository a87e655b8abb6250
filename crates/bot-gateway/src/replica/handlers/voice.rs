//! VOICE_STATE_UPDATE and VOICE_SERVER_UPDATE

use bot_core::VoiceServerInfo;
use serde_json::Value;

use super::super::state_replica::parse;
use super::super::{Notification, StateReplica};
use crate::error::GatewayResult;
use crate::events::{VoiceServerUpdateEvent, VoiceStatePayload};

pub struct VoiceHandler;

impl VoiceHandler {
    /// Move a member between voice channels, reporting where it came from
    pub fn state_update(
        replica: &StateReplica,
        data: Value,
    ) -> GatewayResult<Option<Notification>> {
        let payload: VoiceStatePayload = parse(data)?;
        let Some(guild_id) = payload.guild_id else {
            return Ok(None);
        };
        let user_id = payload.user_id;

        let mut cache = replica.cache().write();
        let Some(guild) = cache.guild(guild_id) else {
            tracing::debug!(guild_id = %guild_id, "Voice state for unknown guild");
            return Ok(None);
        };

        if guild.member(user_id).is_none() {
            let Some((member, user)) = payload.member.as_ref().and_then(|m| m.to_member(guild))
            else {
                tracing::debug!(guild_id = %guild_id, user_id = %user_id, "Voice state for uncached member");
                return Ok(None);
            };
            cache.insert_member(member, user);
        }

        let old = cache
            .member(guild_id, user_id)
            .and_then(|m| m.voice_channel_id())
            .and_then(|id| cache.channel(guild_id, id))
            .cloned();
        let new = payload
            .channel_id
            .and_then(|id| cache.channel(guild_id, id))
            .cloned();

        let state = payload
            .channel_id
            .map(|_| payload.to_voice_state(guild_id));
        let Some(member) = cache.update_member(guild_id, user_id, |m| m.voice_state = state) else {
            return Ok(None);
        };

        Ok(Some(Notification::VoiceStateUpdated {
            guild_id,
            member,
            old,
            new,
            is_bot: cache.is_bot(user_id),
        }))
    }

    /// Needs the bot's own voice session from an earlier state update
    pub fn server_update(
        replica: &StateReplica,
        data: Value,
    ) -> GatewayResult<Option<Notification>> {
        let event: VoiceServerUpdateEvent = parse(data)?;
        let cache = replica.cache().read();

        let Some(bot_id) = cache.bot_user_id() else {
            return Ok(None);
        };
        let session_id = cache
            .member(event.guild_id, bot_id)
            .and_then(|m| m.voice_state.as_ref())
            .map(|vs| vs.session_id.clone())
            .filter(|id| !id.is_empty());
        let Some(session_id) = session_id else {
            tracing::debug!(guild_id = %event.guild_id, "Voice server before own voice state");
            return Ok(None);
        };

        Ok(Some(Notification::VoiceServerAssigned(VoiceServerInfo {
            guild_id: event.guild_id,
            user_id: bot_id,
            session_id,
            token: event.token,
            endpoint: event.endpoint,
        })))
    }
}
