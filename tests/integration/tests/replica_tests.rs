//! State replica tests
//!
//! Dispatches are fed straight into the client, bypassing the socket.

use bot_core::{ChannelType, Embed, MessageAction, RestMethod};
use bot_gateway::events::GatewayEventType;
use bot_gateway::replica::Notification;
use integration_tests::*;
use serde_json::{json, Value};

async fn dispatch(bot: &TestBot, event: GatewayEventType, data: Value) -> Option<Notification> {
    bot.client.handle_dispatch(event, data).await
}

/// READY listing `guilds`, then each guild's snapshot
async fn logged_in(guilds: &[(bot_core::Snowflake, Value)]) -> TestBot {
    let bot = TestBot::new().unwrap();
    let ids: Vec<_> = guilds.iter().map(|(id, _)| *id).collect();
    dispatch(&bot, GatewayEventType::Ready, ready(&ids)).await;
    for (_, snapshot) in guilds {
        dispatch(&bot, GatewayEventType::GuildCreate, snapshot.clone()).await;
    }
    bot
}

fn assert_disjoint(bot: &TestBot) {
    let unavailable = bot.client.unavailable_guilds();
    for id in bot.client.guild_ids() {
        assert!(!unavailable.contains(&id), "guild {id} is both active and unavailable");
    }
}

#[tokio::test]
async fn test_guild_snapshot_is_replicated() {
    let bot = logged_in(&[(G1, guild_g1())]).await;

    let guild = bot.client.guild(G1).unwrap();
    assert_eq!(guild.name, "G1");
    assert_eq!(guild.channels.len(), 2);
    assert_eq!(bot.client.channel(G1, C1).unwrap().channel_type, ChannelType::GuildText);
    assert_eq!(bot.client.channel(G1, C2).unwrap().channel_type, ChannelType::GuildVoice);

    let member = bot.client.member(G1, U1).unwrap();
    assert_eq!(member.role_ids, vec![R1]);
    assert!(guild.member_roles(&member).iter().any(|r| r.name == "R1"));
    assert_eq!(bot.client.owner(G1).unwrap().user_id, U1);
    assert_eq!(bot.client.user(U1).unwrap().username, format!("user{U1}"));
    assert!(bot.rest.requests().is_empty());
}

#[tokio::test]
async fn test_missing_owner_is_fetched() {
    let bot = TestBot::new().unwrap();
    dispatch(&bot, GatewayEventType::Ready, ready(&[])).await;
    bot.rest
        .respond(&format!("/guilds/{G1}/members/{U2}"), 200, member(U2, &[]));

    let mut snapshot = guild_g1();
    snapshot["owner_id"] = json!(U2.to_string());
    let notification = dispatch(&bot, GatewayEventType::GuildCreate, snapshot).await;

    assert!(matches!(notification, Some(Notification::GuildJoined(_))));
    assert_eq!(bot.client.owner(G1).unwrap().user_id, U2);
    assert_eq!(bot.rest.requests().len(), 1);
    assert_eq!(bot.rest.requests()[0].method, RestMethod::Get);
    assert_eq!(bot.controller.calls(), vec!["ready", "guild_join"]);
}

#[tokio::test]
async fn test_active_and_unavailable_sets_stay_disjoint() {
    let bot = TestBot::new().unwrap();
    dispatch(&bot, GatewayEventType::Ready, ready(&[G1, G2])).await;
    assert_eq!(bot.client.unavailable_guilds().len(), 2);
    assert_disjoint(&bot);

    dispatch(&bot, GatewayEventType::GuildCreate, guild_g1()).await;
    assert_eq!(bot.client.guild_ids(), vec![G1]);
    assert_eq!(bot.client.unavailable_guilds(), vec![G2]);
    assert_disjoint(&bot);

    // Outage: G1 goes dark
    let n = dispatch(&bot, GatewayEventType::GuildDelete, guild_delete(G1, true)).await;
    assert!(matches!(n, Some(Notification::GuildUnavailable(_))));
    assert!(bot.client.guild(G1).is_none());
    assert!(bot.client.unavailable_guilds().contains(&G1));
    assert_disjoint(&bot);

    // Back from the outage
    let n = dispatch(&bot, GatewayEventType::GuildCreate, guild_g1()).await;
    assert!(matches!(n, Some(Notification::GuildAvailable(_))));
    assert_disjoint(&bot);

    // Kicked from G1
    let n = dispatch(&bot, GatewayEventType::GuildDelete, guild_delete(G1, false)).await;
    assert!(matches!(n, Some(Notification::GuildLeft(_))));
    assert!(bot.client.guild(G1).is_none());
    assert!(!bot.client.unavailable_guilds().contains(&G1));
    assert_disjoint(&bot);

    assert_eq!(
        bot.controller.calls(),
        vec!["ready", "guild_available", "guild_unavailable", "guild_available", "guild_leave"]
    );
}

#[tokio::test]
async fn test_member_update_is_idempotent() {
    let bot = logged_in(&[(G1, guild_g1())]).await;

    let update = member_update(G1, U1, &[], "renamed");
    dispatch(&bot, GatewayEventType::GuildMemberUpdate, update.clone()).await;
    let once = bot.client.member(G1, U1).unwrap();
    dispatch(&bot, GatewayEventType::GuildMemberUpdate, update).await;
    let twice = bot.client.member(G1, U1).unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice.nickname.as_deref(), Some("renamed"));
    assert!(twice.role_ids.is_empty());
}

#[tokio::test]
async fn test_removed_user_is_evicted_only_when_unreferenced() {
    let bot = logged_in(&[(G1, guild_g1()), (G2, guild_g2())]).await;

    let mut add = member(U2, &[]);
    add["guild_id"] = json!(G1.to_string());
    let n = dispatch(&bot, GatewayEventType::GuildMemberAdd, add).await;
    assert!(matches!(n, Some(Notification::MemberAdded { .. })));
    assert!(bot.client.user(U2).is_some());

    // U2 only belongs to G1
    dispatch(&bot, GatewayEventType::GuildMemberRemove, member_remove(G1, U2)).await;
    assert!(bot.client.member(G1, U2).is_none());
    assert!(bot.client.user(U2).is_none());

    // U1 is still a member of G2
    dispatch(&bot, GatewayEventType::GuildMemberRemove, member_remove(G1, U1)).await;
    assert!(bot.client.member(G1, U1).is_none());
    assert!(bot.client.member(G2, U1).is_some());
    assert!(bot.client.user(U1).is_some());

    assert_eq!(bot.controller.count("member_remove"), 2);
}

#[tokio::test]
async fn test_ban_removes_member() {
    let bot = logged_in(&[(G1, guild_g1())]).await;

    let n = dispatch(&bot, GatewayEventType::GuildBanAdd, member_remove(G1, U1)).await;
    match n {
        Some(Notification::MemberRemoved { banned, user, .. }) => {
            assert!(banned);
            assert_eq!(user.id, U1);
        }
        other => panic!("unexpected notification {other:?}"),
    }
    assert!(bot.client.member(G1, U1).is_none());
}

#[tokio::test]
async fn test_channel_lifecycle() {
    let bot = logged_in(&[(G1, guild_g1())]).await;
    let channel = |name: &str| {
        json!({"id": "1500", "guild_id": G1.to_string(), "type": 0, "name": name})
    };

    dispatch(&bot, GatewayEventType::ChannelCreate, channel("new")).await;
    let id = bot_core::Snowflake::new(1500);
    assert_eq!(bot.client.channel(G1, id).unwrap().name.as_deref(), Some("new"));

    dispatch(&bot, GatewayEventType::ChannelUpdate, channel("renamed")).await;
    assert_eq!(bot.client.channel(G1, id).unwrap().name.as_deref(), Some("renamed"));

    dispatch(&bot, GatewayEventType::ChannelDelete, channel("renamed")).await;
    assert!(bot.client.channel(G1, id).is_none());
    assert_eq!(bot.client.guild(G1).unwrap().channels.len(), 2);
}

#[tokio::test]
async fn test_guild_message_resolves_cached_member() {
    let bot = logged_in(&[(G1, guild_g1())]).await;
    let admin = bot.controller.admin(G1);

    let n = dispatch(
        &bot,
        GatewayEventType::MessageCreate,
        message(Some(G1), C1, U1, "hello"),
    )
    .await;

    let Some(Notification::Message { action, message }) = n else {
        panic!("expected a message");
    };
    assert_eq!(action, MessageAction::Create);
    assert_eq!(message.channel.id, C1);
    assert_eq!(message.member.unwrap().role_ids, vec![R1]);
    assert_eq!(bot.controller.count("message"), 1);
    assert_eq!(
        admin.messages.lock().clone(),
        vec![(MessageAction::Create, "hello".to_string())]
    );
    assert!(bot.rest.requests().is_empty());
}

#[tokio::test]
async fn test_message_from_uncached_author_fetches_member() {
    let bot = logged_in(&[(G1, guild_g1())]).await;
    bot.rest
        .respond(&format!("/guilds/{G1}/members/{U2}"), 200, member(U2, &[R1]));

    let n = dispatch(
        &bot,
        GatewayEventType::MessageCreate,
        message(Some(G1), C1, U2, "hi"),
    )
    .await;

    let Some(Notification::Message { message, .. }) = n else {
        panic!("expected a message");
    };
    assert_eq!(message.member.unwrap().user_id, U2);
    assert!(bot.client.member(G1, U2).is_some());
    assert_eq!(bot.rest.requests_to(&format!("/guilds/{G1}/members/{U2}")).len(), 1);
}

#[tokio::test]
async fn test_message_in_unknown_channel_is_direct() {
    let bot = logged_in(&[]).await;
    let dm = bot_core::Snowflake::new(7000);

    let n = dispatch(&bot, GatewayEventType::MessageCreate, message(None, dm, U1, "psst")).await;

    let Some(Notification::Message { message, .. }) = n else {
        panic!("expected a message");
    };
    assert!(message.channel.is_dm());
    assert_eq!(message.channel.id, dm);
    assert!(message.member.is_none());
    assert_eq!(message.author.unwrap().id, U1);
}

#[tokio::test]
async fn test_events_for_unknown_guilds_are_ignored() {
    let bot = logged_in(&[]).await;

    let n = dispatch(
        &bot,
        GatewayEventType::GuildMemberUpdate,
        member_update(G1, U1, &[], "x"),
    )
    .await;
    assert!(n.is_none());

    let n = dispatch(&bot, GatewayEventType::GuildCreate, json!({"name": "no id"})).await;
    assert!(n.is_none());
    assert!(bot.client.guild_ids().is_empty());
}

#[tokio::test]
async fn test_send_message_posts_to_channel() {
    let bot = logged_in(&[(G1, guild_g1())]).await;
    let path = format!("/channels/{C1}/messages");
    bot.rest.respond(&path, 200, json!({"id": "1"}));

    let channel = bot.client.channel(G1, C1).unwrap();
    bot.client.send_message(&channel, "hello", None, false).await.unwrap();

    let requests = bot.rest.requests_to(&path);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, RestMethod::Post);
    assert_eq!(requests[0].body, Some(json!({"content": "hello", "tts": false})));
}

#[tokio::test]
async fn test_send_message_rejects_voice_channel() {
    let bot = logged_in(&[(G1, guild_g1())]).await;

    let voice = bot.client.channel(G1, C2).unwrap();
    assert!(bot.client.send_message(&voice, "hello", None, false).await.is_err());
    assert!(bot.rest.requests().is_empty());
}

#[tokio::test]
async fn test_send_message_surfaces_http_errors() {
    let bot = logged_in(&[(G1, guild_g1())]).await;

    let channel = bot.client.channel(G1, C1).unwrap();
    assert!(bot.client.send_message(&channel, "hello", None, false).await.is_err());
}

#[tokio::test]
async fn test_send_direct_message_opens_channel_first() {
    let bot = logged_in(&[]).await;
    bot.rest
        .respond("/users/@me/channels", 200, json!({"id": "5000", "type": 1}));
    bot.rest.respond("/channels/5000/messages", 200, json!({"id": "2"}));

    bot.client.send_direct_message(U1, "hey", None, false).await.unwrap();

    let requests = bot.rest.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/users/@me/channels");
    assert_eq!(requests[0].body, Some(json!({"recipient_id": U1.to_string()})));
    assert_eq!(requests[1].path, "/channels/5000/messages");
    assert_eq!(requests[1].body, Some(json!({"content": "hey", "tts": false})));
}

#[tokio::test]
async fn test_send_message_with_embed_and_tts() {
    let bot = logged_in(&[(G1, guild_g1())]).await;
    let path = format!("/channels/{C1}/messages");
    bot.rest.respond(&path, 200, json!({"id": "1"}));

    let embed = Embed::new().title("Now playing").color(0xff0000);
    let channel = bot.client.channel(G1, C1).unwrap();
    bot.client
        .send_message(&channel, "", Some(&embed), true)
        .await
        .unwrap();

    let requests = bot.rest.requests_to(&path);
    assert_eq!(
        requests[0].body,
        Some(json!({
            "content": "",
            "tts": true,
            "embed": {"title": "Now playing", "color": 16_711_680}
        }))
    );
}

#[tokio::test]
async fn test_direct_message_carries_embed_and_tts() {
    let bot = logged_in(&[]).await;
    bot.rest
        .respond("/users/@me/channels", 200, json!({"id": "5000", "type": 1}));
    bot.rest.respond("/channels/5000/messages", 200, json!({"id": "2"}));

    let embed = Embed::new().description("Queue is empty").field("Next", "-", false);
    bot.client
        .send_direct_message(U1, "status", Some(&embed), true)
        .await
        .unwrap();

    let body = bot.rest.requests_to("/channels/5000/messages")[0]
        .body
        .clone()
        .unwrap();
    assert_eq!(body["content"], "status");
    assert_eq!(body["tts"], true);
    assert_eq!(body["embed"]["description"], "Queue is empty");
    assert_eq!(
        body["embed"]["fields"],
        json!([{"name": "Next", "value": "-", "inline": false}])
    );
    assert!(body["embed"].get("title").is_none());
}
