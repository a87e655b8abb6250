//! READY, GUILD_CREATE and GUILD_DELETE

use bot_cache::GuildInsert;
use serde_json::Value;

use super::super::state_replica::parse;
use super::super::{Notification, StateReplica};
use crate::error::GatewayResult;
use crate::events::{GuildCreateEvent, ReadyEvent, UnavailableGuild};

/// Handles guild availability and the session's opening snapshot
pub struct GuildHandler;

impl GuildHandler {
    /// Record the bot user; every listed guild starts out unavailable
    pub fn ready(replica: &StateReplica, data: Value) -> GatewayResult<Option<Notification>> {
        let ready: ReadyEvent = parse(data)?;
        let user = ready.user.to_user();

        let mut cache = replica.cache().write();
        cache.set_bot_user(user.clone());
        for guild in &ready.guilds {
            cache.note_unavailable(guild.id);
        }

        tracing::info!(
            user_id = %user.id,
            username = %user.username,
            guilds = ready.guilds.len(),
            version = ready.v,
            "Session ready"
        );
        Ok(Some(Notification::Ready(user)))
    }

    pub async fn create(
        replica: &StateReplica,
        data: Value,
    ) -> GatewayResult<Option<Notification>> {
        let event: GuildCreateEvent = parse(data)?;
        let (mut guild, mut users) = event.build();

        // The owner must resolve to a member; fetch it when the snapshot
        // left it out.
        if let Some(owner_id) = guild.owner_id {
            if !guild.members.contains_key(&owner_id) {
                if let Some(payload) = replica.fetch_member(guild.id, owner_id).await {
                    if let Some((member, user)) = payload.to_member(&guild) {
                        users.insert(user.id, user);
                        guild.members.insert(member.user_id, member);
                    }
                }
            }
        }

        let guild_id = guild.id;
        let mut cache = replica.cache().write();
        let outcome = cache.insert_guild(guild, users);
        let Some(snapshot) = cache.guild(guild_id).cloned() else {
            return Ok(None);
        };

        tracing::info!(
            guild_id = %guild_id,
            name = %snapshot.name,
            members = snapshot.members.len(),
            outcome = ?outcome,
            "Guild cached"
        );
        Ok(Some(match outcome {
            GuildInsert::Joined => Notification::GuildJoined(snapshot),
            GuildInsert::Available | GuildInsert::Refreshed => {
                Notification::GuildAvailable(snapshot)
            }
        }))
    }

    /// An unavailability flag keeps the data; anything else purges the guild
    pub fn delete(replica: &StateReplica, data: Value) -> GatewayResult<Option<Notification>> {
        let event: UnavailableGuild = parse(data)?;
        let mut cache = replica.cache().write();

        if event.unavailable {
            return Ok(match cache.mark_unavailable(event.id) {
                Some(guild) => {
                    tracing::warn!(guild_id = %event.id, "Guild became unavailable");
                    Some(Notification::GuildUnavailable(guild))
                }
                None => {
                    cache.note_unavailable(event.id);
                    None
                }
            });
        }

        Ok(match cache.remove_guild(event.id) {
            Some(guild) => {
                tracing::info!(guild_id = %event.id, "Left guild");
                Some(Notification::GuildLeft(guild))
            }
            None => {
                tracing::debug!(guild_id = %event.id, "Delete for unknown guild");
                None
            }
        })
    }
}
