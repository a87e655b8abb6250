//! GUILD_MEMBER_ADD, GUILD_MEMBER_UPDATE, GUILD_MEMBER_REMOVE and GUILD_BAN_ADD

use serde_json::Value;

use super::super::state_replica::parse;
use super::super::{Notification, StateReplica};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{known_roles, GuildMemberRemoveEvent, GuildMemberUpdateEvent, MemberPayload};

pub struct MemberHandler;

impl MemberHandler {
    pub fn add(replica: &StateReplica, data: Value) -> GatewayResult<Option<Notification>> {
        let payload: MemberPayload = parse(data)?;
        let guild_id = payload
            .guild_id
            .ok_or_else(|| GatewayError::malformed("member add without guild_id"))?;

        let mut cache = replica.cache().write();
        let Some(guild) = cache.guild(guild_id) else {
            tracing::debug!(guild_id = %guild_id, "Member add for unknown guild");
            return Ok(None);
        };
        let (member, user) = payload
            .to_member(guild)
            .ok_or_else(|| GatewayError::malformed("member add without user"))?;

        let user_id = user.id;
        cache.insert_member(member, user);
        let member = cache.member(guild_id, user_id).cloned();
        let user = cache.user(user_id).cloned();
        Ok(member
            .zip(user)
            .map(|(member, user)| Notification::MemberAdded {
                guild_id,
                member,
                user,
            }))
    }

    /// Replace roles, nickname and boost date in place
    pub fn update(replica: &StateReplica, data: Value) -> GatewayResult<Option<Notification>> {
        let event: GuildMemberUpdateEvent = parse(data)?;
        let user_id = event.user.id;

        let mut cache = replica.cache().write();
        let Some(guild) = cache.guild(event.guild_id) else {
            tracing::debug!(guild_id = %event.guild_id, "Member update for unknown guild");
            return Ok(None);
        };
        let roles = known_roles(guild, &event.roles);

        let member = cache.update_member(event.guild_id, user_id, |member| {
            member.set_roles(roles);
            member.set_nickname(event.nick.clone());
            member.premium_since.clone_from(&event.premium_since);
        });
        let Some(member) = member else {
            tracing::debug!(guild_id = %event.guild_id, user_id = %user_id, "Update for uncached member");
            return Ok(None);
        };
        cache.refresh_user(&event.user.to_user());

        Ok(Some(Notification::MemberUpdated {
            guild_id: event.guild_id,
            member,
        }))
    }

    /// Remove (or ban) a member; the user is evicted once nothing holds it
    pub fn remove(
        replica: &StateReplica,
        data: Value,
        banned: bool,
    ) -> GatewayResult<Option<Notification>> {
        let event: GuildMemberRemoveEvent = parse(data)?;
        let removed = replica
            .cache()
            .write()
            .remove_member(event.guild_id, event.user.id);

        let Some(removed) = removed else {
            tracing::debug!(guild_id = %event.guild_id, user_id = %event.user.id, "Remove for uncached member");
            return Ok(None);
        };
        tracing::debug!(
            guild_id = %event.guild_id,
            user_id = %event.user.id,
            banned,
            evicted = removed.evicted,
            "Member removed"
        );

        Ok(Some(Notification::MemberRemoved {
            guild_id: event.guild_id,
            member: removed.member,
            user: removed.user.unwrap_or_else(|| event.user.to_user()),
            banned,
        }))
    }
}
