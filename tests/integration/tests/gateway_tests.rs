//! Gateway session tests
//!
//! Drive the client through a mock socket: handshake, dispatch, liveness
//! loss, invalidated sessions and shutdown.

use std::time::Duration;

use integration_tests::*;
use serde_json::json;

#[tokio::test]
async fn test_hello_without_session_sends_one_identify() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.connect().await.unwrap();

    peer.hello(60_000).await;
    let identify = peer.next_op(2).await.unwrap();
    assert_eq!(identify["d"]["token"], "test-token");
    assert_eq!(identify["d"]["presence"]["status"], "online");

    // Only heartbeats follow the handshake
    match peer.next().await.unwrap() {
        Sent::Frame(frame) => assert_eq!(frame["op"], 1),
        Sent::Close(code) => panic!("unexpected close {code}"),
    }
    assert_eq!(bot.transport.opened(), 1);
}

#[tokio::test]
async fn test_run_resolves_gateway_url_over_rest() {
    let bot = TestBot::new().unwrap();
    bot.rest.respond(
        "/gateway/bot",
        200,
        json!({
            "url": "wss://gateway.example",
            "shards": 1,
            "session_start_limit": {"total": 1000, "remaining": 999, "reset_after": 0}
        }),
    );

    let client = bot.client.clone();
    let run = tokio::spawn(async move { client.run().await });

    let mut peer = bot.transport.next_peer().await.unwrap();
    peer.hello(60_000).await;
    peer.next_op(2).await.unwrap();
    assert_eq!(bot.transport.urls(), vec!["wss://gateway.example/?v=8&encoding=json"]);

    bot.client.quit().await;
    let result = tokio::time::timeout(WAIT, run).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_run_fails_without_gateway_info() {
    let bot = TestBot::new().unwrap();
    assert!(bot.client.run().await.is_err());
    assert_eq!(bot.transport.opened(), 0);
}

#[tokio::test]
async fn test_ready_and_guild_create_over_socket() {
    let bot = TestBot::new().unwrap();
    let peer = bot.login(ready(&[G1])).await.unwrap();

    assert!(eventually(|| bot.client.bot_user().is_some()).await);
    assert_eq!(bot.client.bot_user().unwrap().id, BOT);
    assert_eq!(bot.client.unavailable_guilds(), vec![G1]);
    assert_eq!(bot.client.connection().session_id().as_deref(), Some("session-1"));

    peer.dispatch(2, "GUILD_CREATE", guild_g1()).await;
    assert!(eventually(|| bot.client.guild(G1).is_some()).await);
    assert!(bot.client.unavailable_guilds().is_empty());
    assert_eq!(bot.client.connection().last_sequence(), Some(2));
    assert_eq!(bot.controller.calls(), vec!["ready", "guild_available"]);
}

#[tokio::test]
async fn test_missed_heartbeat_ack_resumes_on_new_socket() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.connect().await.unwrap();

    // Short interval and no ACKs: the second beat finds the first unanswered
    peer.hello(100).await;
    peer.next_op(2).await.unwrap();
    peer.dispatch(1, "READY", ready(&[])).await;

    assert_eq!(peer.next_close().await.unwrap(), 4000);
    let mut second = bot.transport.next_peer().await.unwrap();
    assert!(eventually(|| bot.controller.count("disconnect") == 1).await);

    second.hello(60_000).await;
    let resume = second.next_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "session-1");
    assert_eq!(resume["d"]["seq"], 1);
    assert_eq!(resume["d"]["token"], "test-token");

    second.dispatch(2, "RESUMED", json!({})).await;
    assert!(eventually(|| bot.controller.count("resume") == 1).await);
    assert_eq!(bot.transport.opened(), 2);
}

#[tokio::test]
async fn test_zombie_tears_down_voice() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.connect().await.unwrap();
    peer.hello(300).await;
    peer.next_op(2).await.unwrap();
    peer.dispatch(1, "READY", ready(&[])).await;
    peer.dispatch(2, "GUILD_CREATE", guild_g1()).await;
    peer.dispatch(3, "VOICE_STATE_UPDATE", voice_state(G1, BOT, Some(C2))).await;
    peer.dispatch(4, "VOICE_SERVER_UPDATE", voice_server(G1)).await;
    assert!(eventually(|| bot.client.voice().has_connection(G1)).await);

    assert_eq!(peer.next_close().await.unwrap(), 4000);
    assert!(eventually(|| !bot.client.voice().has_connection(G1)).await);
    assert!(!bot.client.voice().has_queue(G1));
    assert!(bot.voice.connection.disconnected.load(std::sync::atomic::Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_resumable_invalid_session_resumes_on_same_socket() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();
    assert!(eventually(|| bot.client.connection().session_id().is_some()).await);

    peer.send(json!({"op": 9, "d": true})).await;
    let resume = peer.next_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "session-1");
    assert_eq!(bot.transport.opened(), 1);
}

#[tokio::test]
async fn test_non_resumable_invalid_session_identifies_again() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();
    assert!(eventually(|| bot.client.connection().session_id().is_some()).await);

    peer.send(json!({"op": 9, "d": false})).await;
    assert_eq!(peer.next_close().await.unwrap(), 4000);

    let mut second = bot.transport.next_peer().await.unwrap();
    second.hello(60_000).await;
    second.next_op(2).await.unwrap();
    assert!(bot.client.connection().session_id().is_none());
}

#[tokio::test]
async fn test_server_reconnect_request_opens_fresh_session() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();
    assert!(eventually(|| bot.client.connection().session_id().is_some()).await);

    peer.send(json!({"op": 7, "d": null})).await;
    assert_eq!(peer.next_close().await.unwrap(), 4000);

    let mut second = bot.transport.next_peer().await.unwrap();
    second.hello(60_000).await;
    second.next_op(2).await.unwrap();
}

#[tokio::test]
async fn test_resumable_close_resumes() {
    let bot = TestBot::new().unwrap();
    let peer = bot.login(ready(&[])).await.unwrap();
    assert!(eventually(|| bot.client.connection().session_id().is_some()).await);

    peer.close(4008).await;
    let mut second = bot.transport.next_peer().await.unwrap();
    second.hello(60_000).await;
    second.next_op(6).await.unwrap();
    assert_eq!(bot.controller.count("disconnect"), 1);
}

#[tokio::test]
async fn test_fatal_close_quits() {
    let bot = TestBot::new().unwrap();
    let peer = bot.login(ready(&[G1])).await.unwrap();
    assert!(eventually(|| bot.client.bot_user().is_some()).await);

    peer.close(4004).await;
    tokio::time::timeout(WAIT, bot.client.wait_for_quit())
        .await
        .unwrap();

    assert!(bot.client.is_quitting());
    assert_eq!(bot.controller.count("quit"), 1);
    assert!(bot.client.bot_user().is_none());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bot.transport.opened(), 1);
}

#[tokio::test]
async fn test_quit_closes_normally_and_clears_state() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();
    peer.dispatch(2, "GUILD_CREATE", guild_g1()).await;
    assert!(eventually(|| bot.client.guild(G1).is_some()).await);

    bot.client.quit().await;
    assert_eq!(peer.next_close().await.unwrap(), 1000);
    assert!(bot.client.guild(G1).is_none());
    assert!(bot.client.connection().is_terminated());
    assert!(!bot.client.connection().is_heartbeating());

    let calls = bot.controller.calls();
    assert_eq!(&calls[calls.len() - 2..], ["disconnect", "quit"]);

    // A second quit is a no-op
    bot.client.quit().await;
    assert_eq!(bot.controller.count("quit"), 1);
}

#[tokio::test]
async fn test_quit_async_goes_through_bus() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();

    bot.client.quit_async();
    assert!(!bot.client.is_quitting());
    tokio::time::timeout(WAIT, bot.client.wait_for_quit())
        .await
        .unwrap();
    assert_eq!(peer.next_close().await.unwrap(), 1000);
}

#[tokio::test]
async fn test_presence_updates_are_sent_when_live() {
    let bot = TestBot::new().unwrap();
    let mut peer = bot.login(ready(&[])).await.unwrap();

    bot.client.set_presence("dnd", true).await.unwrap();
    let frame = peer.next_op(3).await.unwrap();
    assert_eq!(frame["d"]["status"], "dnd");
    assert_eq!(frame["d"]["afk"], true);

    bot.client
        .set_activity("live", Some("https://twitch.tv/bot"))
        .await
        .unwrap();
    let frame = peer.next_op(3).await.unwrap();
    assert_eq!(frame["d"]["game"]["name"], "live");
    assert_eq!(frame["d"]["game"]["type"], 1);
    assert_eq!(frame["d"]["status"], "dnd");

    bot.client.set_presence("sleeping", false).await.unwrap();
    let frame = peer.next_op(3).await.unwrap();
    assert_eq!(frame["d"]["status"], "offline");
}
