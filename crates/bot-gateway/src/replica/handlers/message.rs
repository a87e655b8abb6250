//! MESSAGE_CREATE, MESSAGE_UPDATE and MESSAGE_DELETE

use bot_core::{Channel, GuildMember, Message, MessageAction, Snowflake, User};
use serde_json::Value;

use super::super::state_replica::parse;
use super::super::{Notification, StateReplica};
use crate::error::GatewayResult;
use crate::events::{MessagePayload, UserPayload};

pub struct MessageHandler;

impl MessageHandler {
    /// Build a transient message; unknown channels are taken to be DMs
    pub async fn handle(
        replica: &StateReplica,
        data: Value,
        action: MessageAction,
    ) -> GatewayResult<Option<Notification>> {
        let payload: MessagePayload = parse(data)?;
        let author = payload.author.as_ref().map(UserPayload::to_user);

        let (channel, member) = {
            let cache = replica.cache().read();
            let channel = payload
                .guild_id
                .and_then(|g| cache.channel(g, payload.channel_id))
                .or_else(|| cache.find_channel(payload.channel_id))
                .cloned()
                .unwrap_or_else(|| Channel::new_dm(payload.channel_id));
            let member = payload
                .guild_id
                .zip(author.as_ref())
                .and_then(|(g, a)| cache.member(g, a.id))
                .cloned();
            (channel, member)
        };

        let member = match (member, payload.guild_id, &author) {
            (Some(member), _, _) => Some(member),
            (None, Some(guild_id), Some(author)) => {
                Self::resolve_member(replica, &payload, guild_id, author).await
            }
            _ => None,
        };

        let message = Message {
            id: payload.id,
            channel,
            guild_id: payload.guild_id,
            author,
            member,
            content: payload.content,
            timestamp: payload.timestamp,
            edited_timestamp: payload.edited_timestamp,
            tts: payload.tts,
            mention_everyone: payload.mention_everyone,
            mentions: payload.mentions.iter().map(UserPayload::to_user).collect(),
        };
        Ok(Some(Notification::Message { action, message }))
    }

    /// Cache the author's member from the embedded partial, or from REST
    async fn resolve_member(
        replica: &StateReplica,
        payload: &MessagePayload,
        guild_id: Snowflake,
        author: &User,
    ) -> Option<GuildMember> {
        let mut partial = match payload.member.clone() {
            Some(partial) => partial,
            None => replica.fetch_member(guild_id, author.id).await?,
        };
        if partial.user.is_none() {
            partial.user.clone_from(&payload.author);
        }

        let mut cache = replica.cache().write();
        let (member, user) = partial.to_member(cache.guild(guild_id)?)?;
        let user_id = user.id;
        cache.insert_member(member, user);
        cache.member(guild_id, user_id).cloned()
    }
}
