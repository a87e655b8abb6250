//! PRESENCE_UPDATE

use serde_json::Value;

use super::super::state_replica::parse;
use super::super::{Notification, StateReplica};
use crate::error::GatewayResult;
use crate::events::PresencePayload;

pub struct PresenceHandler;

impl PresenceHandler {
    /// Apply status and activities; an uncached member is fetched first
    pub async fn handle(
        replica: &StateReplica,
        data: Value,
    ) -> GatewayResult<Option<Notification>> {
        let presence: PresencePayload = parse(data)?;
        let Some(guild_id) = presence.guild_id else {
            return Ok(None);
        };
        let user_id = presence.user.id;

        let cached = {
            let cache = replica.cache().read();
            if cache.guild(guild_id).is_none() {
                tracing::debug!(guild_id = %guild_id, "Presence for unknown guild");
                return Ok(None);
            }
            cache.member(guild_id, user_id).is_some()
        };

        if !cached {
            let Some(payload) = replica.fetch_member(guild_id, user_id).await else {
                return Ok(None);
            };
            let mut cache = replica.cache().write();
            let Some((member, user)) = cache.guild(guild_id).and_then(|g| payload.to_member(g))
            else {
                return Ok(None);
            };
            cache.insert_member(member, user);
        }

        let mut cache = replica.cache().write();
        let Some(user) = cache.update_user(user_id, |user| presence.apply_to(user)) else {
            return Ok(None);
        };
        let Some(member) = cache.member(guild_id, user_id).cloned() else {
            return Ok(None);
        };

        Ok(Some(Notification::PresenceUpdated {
            guild_id,
            member,
            user,
        }))
    }
}
