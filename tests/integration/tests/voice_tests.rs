//! Voice and playback queue tests

use std::sync::atomic::Ordering;

use bot_core::{AudioSource, SongInfo};
use bot_gateway::events::GatewayEventType;
use integration_tests::*;
use serde_json::Value;

fn titles(bot: &TestBot) -> Vec<String> {
    bot.client
        .queue(G1)
        .unwrap_or_default()
        .iter()
        .map(|s| s.title().to_string())
        .collect()
}

async fn dispatch(bot: &TestBot, event: GatewayEventType, data: Value) {
    bot.client.handle_dispatch(event, data).await;
}

/// Bot in G1 with an established voice connection in C2
async fn in_voice() -> TestBot {
    let bot = TestBot::new().unwrap();
    dispatch(&bot, GatewayEventType::Ready, ready(&[])).await;
    dispatch(&bot, GatewayEventType::GuildCreate, guild_g1()).await;
    dispatch(&bot, GatewayEventType::VoiceStateUpdate, voice_state(G1, BOT, Some(C2))).await;
    dispatch(&bot, GatewayEventType::VoiceServerUpdate, voice_server(G1)).await;
    assert!(bot.client.voice().has_connection(G1));
    bot
}

#[tokio::test]
async fn test_voice_server_update_establishes_connection() {
    let bot = in_voice().await;

    let infos = bot.voice.infos.lock().clone();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].guild_id, G1);
    assert_eq!(infos[0].user_id, BOT);
    assert_eq!(infos[0].session_id, format!("voice-session-{BOT}"));
    assert_eq!(infos[0].token, "voice-token");
    assert_eq!(infos[0].endpoint.as_deref(), Some("voice.test:443"));
    assert!(bot.client.voice().has_queue(G1));
    assert_eq!(bot.controller.calls().last().unwrap(), &format!("voice:-->{C2}"));
}

#[tokio::test]
async fn test_bot_leaving_voice_drops_connection_and_queue() {
    let bot = in_voice().await;
    bot.client.enqueue(G1, track("a"));

    dispatch(&bot, GatewayEventType::VoiceStateUpdate, voice_state(G1, BOT, None)).await;

    assert!(!bot.client.voice().has_connection(G1));
    assert!(!bot.client.voice().has_queue(G1));
    assert_eq!(bot.voice.connection.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(bot.controller.calls().last().unwrap(), &format!("voice:{C2}->-"));
    assert!(bot.client.member(G1, BOT).unwrap().voice_state.is_none());
}

#[tokio::test]
async fn test_other_user_leaving_keeps_connection() {
    let bot = in_voice().await;
    let admin = bot.controller.admin(G1);
    dispatch(&bot, GatewayEventType::VoiceStateUpdate, voice_state(G1, U1, Some(C2))).await;
    dispatch(&bot, GatewayEventType::VoiceStateUpdate, voice_state(G1, U1, None)).await;

    assert!(bot.client.voice().has_connection(G1));
    assert_eq!(admin.voice_channels.lock().clone(), vec![C2, C2]);
    assert_eq!(bot.client.guild(G1).unwrap().voice_members(C2).count(), 1);
}

#[tokio::test]
async fn test_start_speaking_takes_head_of_queue() {
    let bot = in_voice().await;
    bot.client.enqueue(G1, track("a"));
    bot.client.enqueue(G1, track("b"));

    let c2 = bot.client.channel(G1, C2).unwrap();
    assert!(bot.client.start_speaking(&c2, None).await.unwrap());

    assert_eq!(bot.voice.connection.started(), vec!["a"]);
    assert_eq!(titles(&bot), vec!["b"]);
    assert!(bot.client.is_playing(G1));
    assert_eq!(bot.client.audio_source(G1).unwrap().title(), "a");
}

#[tokio::test]
async fn test_start_speaking_with_empty_queue_does_nothing() {
    let bot = in_voice().await;

    let c2 = bot.client.channel(G1, C2).unwrap();
    assert!(!bot.client.start_speaking(&c2, None).await.unwrap());
    assert!(bot.voice.connection.started().is_empty());
    assert!(!bot.client.is_playing(G1));
}

#[tokio::test]
async fn test_finished_item_advances_queue() {
    let bot = in_voice().await;
    bot.client.start();
    bot.client.enqueue(G1, track("a"));
    bot.client.enqueue(G1, track("b"));

    let c2 = bot.client.channel(G1, C2).unwrap();
    bot.client.start_speaking(&c2, None).await.unwrap();

    bot.voice.finish(G1).unwrap();
    assert!(eventually(|| bot.voice.connection.started() == ["a", "b"]).await);
    assert!(titles(&bot).is_empty());
    assert_eq!(bot.controller.count("end_speaking"), 1);

    // Nothing left: the queue survives, empty
    bot.voice.finish(G1).unwrap();
    assert!(eventually(|| bot.controller.count("end_speaking") == 2).await);
    assert_eq!(bot.voice.connection.started().len(), 2);
    assert!(bot.client.voice().has_queue(G1));
}

#[tokio::test]
async fn test_pending_source_plays_once_voice_is_established() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();
    peer.dispatch(2, "GUILD_CREATE", guild_g1()).await;
    assert!(eventually(|| bot.client.guild(G1).is_some()).await);

    let c2 = bot.client.channel(G1, C2).unwrap();
    assert!(bot.client.start_speaking(&c2, Some(track("intro"))).await.unwrap());

    let join = peer.next_op(4).await.unwrap();
    assert_eq!(join["d"]["guild_id"], G1.to_string());
    assert_eq!(join["d"]["channel_id"], C2.to_string());
    assert_eq!(join["d"]["self_mute"], false);
    assert!(!bot.client.voice().has_connection(G1));

    peer.dispatch(3, "VOICE_STATE_UPDATE", voice_state(G1, BOT, Some(C2))).await;
    peer.dispatch(4, "VOICE_SERVER_UPDATE", voice_server(G1)).await;

    assert!(eventually(|| bot.voice.connection.started() == ["intro"]).await);
    assert!(bot.client.voice().has_connection(G1));
}

#[tokio::test]
async fn test_join_rejects_channel_outside_guild() {
    let bot = TestBot::new().unwrap();
    let dm = bot_core::Channel::new_dm(bot_core::Snowflake::new(7000));
    assert!(bot.client.join_voice(&dm).await.is_err());
}

#[tokio::test]
async fn test_leave_voice_sends_null_channel() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();

    bot.client.leave_voice(G1).await.unwrap();
    let leave = peer.next_op(4).await.unwrap();
    assert_eq!(leave["d"]["guild_id"], G1.to_string());
    assert!(leave["d"]["channel_id"].is_null());
}

#[tokio::test]
async fn test_guild_outage_tears_down_voice() {
    let bot = in_voice().await;

    dispatch(&bot, GatewayEventType::GuildDelete, guild_delete(G1, true)).await;

    assert!(!bot.client.voice().has_connection(G1));
    assert!(!bot.client.voice().has_queue(G1));
    assert_eq!(bot.voice.connection.disconnected.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_queue_editing() {
    let bot = in_voice().await;
    for title in ["One", "Two", "Three"] {
        bot.client.enqueue(G1, track(title));
    }

    assert!(bot.client.remove_from_queue(G1, "two").is_some());
    assert_eq!(titles(&bot), vec!["One", "Three"]);
    assert!(bot.client.remove_from_queue(G1, 5usize).is_none());
    assert_eq!(bot.client.remove_from_queue(G1, 0usize).unwrap().title(), "One");

    bot.client.clear_queue(G1);
    assert!(titles(&bot).is_empty());
    assert!(bot.client.voice().has_queue(G1));
}

#[tokio::test]
async fn test_playback_controls() {
    let bot = in_voice().await;
    let c2 = bot.client.channel(G1, C2).unwrap();
    bot.client.start_speaking(&c2, Some(track("a"))).await.unwrap();

    assert!(bot.client.pause_speaking(G1));
    assert!(bot.client.resume_speaking(G1));
    assert!(bot.client.stop_speaking(G1));
    assert!(!bot.client.is_playing(G1));

    assert!(!bot.client.pause_speaking(G2));
    assert!(!bot.client.stop_speaking(G2));
}

#[tokio::test]
async fn test_quit_leaves_voice() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();
    peer.dispatch(2, "GUILD_CREATE", guild_g1()).await;
    peer.dispatch(3, "VOICE_STATE_UPDATE", voice_state(G1, BOT, Some(C2))).await;
    peer.dispatch(4, "VOICE_SERVER_UPDATE", voice_server(G1)).await;
    assert!(eventually(|| bot.client.voice().has_connection(G1)).await);

    bot.client.quit().await;

    let leave = peer.next_op(4).await.unwrap();
    assert!(leave["d"]["channel_id"].is_null());
    assert_eq!(peer.next_close().await.unwrap(), 1000);
    assert!(!bot.client.voice().has_connection(G1));
    assert_eq!(bot.voice.connection.disconnected.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_song_request_is_prepared_and_played() {
    let bot = in_voice().await;
    bot.client.start();
    bot.client
        .enqueue_song(G1, SongInfo::new("Remote", "https://example.com/remote.ogg").requested_by(U1))
        .unwrap();
    bot.client.enqueue(G1, track("local"));
    assert_eq!(titles(&bot), vec!["Remote", "local"]);

    let c2 = bot.client.channel(G1, C2).unwrap();
    assert!(bot.client.start_speaking(&c2, None).await.unwrap());

    assert!(eventually(|| bot.voice.connection.started() == ["Remote"]).await);
    assert_eq!(bot.songs.resolved.lock().clone(), vec!["Remote"]);
    assert_eq!(titles(&bot), vec!["local"]);

    bot.voice.finish(G1).unwrap();
    assert!(eventually(|| bot.voice.connection.started() == ["Remote", "local"]).await);
}

#[tokio::test]
async fn test_unavailable_song_is_skipped() {
    let bot = in_voice().await;
    bot.client.start();
    bot.client
        .enqueue_song(G1, SongInfo::new("Gone", "unavailable"))
        .unwrap();
    bot.client.enqueue(G1, track("fallback"));

    let c2 = bot.client.channel(G1, C2).unwrap();
    assert!(bot.client.start_speaking(&c2, None).await.unwrap());

    assert!(eventually(|| bot.voice.connection.started() == ["fallback"]).await);
    assert!(bot.songs.resolved.lock().is_empty());
}
