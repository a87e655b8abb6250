//! Fan-out of replica notifications

use bot_core::MessageAction;

use super::BotClient;
use crate::replica::Notification;

impl BotClient {
    /// Apply voice side effects, then tell the controller and the guild's
    /// admin handler
    pub(super) async fn notify(&self, notification: &Notification) {
        let inner = self.inner_ref();
        let controller = inner.controller.as_ref();

        match notification {
            Notification::Ready(user) => controller.on_ready(user),
            Notification::Resumed => {
                tracing::info!("Session resumed");
                controller.on_resume();
            }
            Notification::GuildJoined(guild) => controller.on_guild_join(guild),
            Notification::GuildAvailable(guild) => controller.on_guild_available(guild),
            Notification::GuildUnavailable(guild) => {
                inner.voice.teardown(guild.id);
                controller.on_guild_unavailable(guild);
            }
            Notification::GuildLeft(guild) => {
                inner.voice.teardown(guild.id);
                controller.on_guild_leave(guild);
            }
            Notification::ChannelCreated(_)
            | Notification::ChannelUpdated(_)
            | Notification::ChannelDeleted(_) => {}
            Notification::MemberAdded {
                guild_id,
                member,
                user,
            } => controller.on_member_add(*guild_id, member, user),
            Notification::MemberUpdated { guild_id, member } => {
                controller.on_member_update(*guild_id, member);
            }
            Notification::MemberRemoved {
                guild_id,
                member,
                user,
                ..
            } => controller.on_member_remove(*guild_id, member, user),
            Notification::PresenceUpdated {
                guild_id,
                member,
                user,
            } => controller.on_presence_update(*guild_id, member, user),
            Notification::VoiceStateUpdated {
                guild_id,
                member,
                old,
                new,
                is_bot,
            } => {
                if *is_bot && member.voice_state.is_none() {
                    inner.voice.teardown(*guild_id);
                }
                controller.on_voice_state_update(*guild_id, member, old.as_ref(), new.as_ref());
                if let Some(channel) = old.as_ref().or(new.as_ref()) {
                    if let Some(admin) = controller.guild_admin(*guild_id) {
                        admin.on_user_voice_state_changed(channel, member);
                    }
                }
            }
            Notification::VoiceServerAssigned(info) => {
                if let Err(e) = inner.voice.establish(info.clone()).await {
                    tracing::warn!(guild_id = %info.guild_id, error = %e, "Voice connection failed");
                }
            }
            Notification::Message { action, message } => {
                match action {
                    MessageAction::Create => controller.on_message(message),
                    MessageAction::Edit => controller.on_message_edited(message),
                    MessageAction::Delete => controller.on_message_deleted(message),
                }
                if let Some(admin) = message.guild_id.and_then(|g| controller.guild_admin(g)) {
                    admin.on_message_event(*action, message);
                }
            }
        }
    }
}
