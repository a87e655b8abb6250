//! Dispatch bodies for a small fixed world
//!
//! Guild `G1` has a text channel `C1`, a voice channel `C2`, one role `R1`
//! and a member `U1` holding `R1` who also owns the guild.

use bot_core::Snowflake;
use serde_json::{json, Value};

pub const BOT: Snowflake = Snowflake::new(1);
pub const G1: Snowflake = Snowflake::new(1000);
pub const G2: Snowflake = Snowflake::new(1100);
pub const C1: Snowflake = Snowflake::new(1001);
pub const C2: Snowflake = Snowflake::new(1002);
pub const R1: Snowflake = Snowflake::new(1003);
pub const U1: Snowflake = Snowflake::new(2001);
pub const U2: Snowflake = Snowflake::new(2002);

pub fn user(id: Snowflake) -> Value {
    json!({
        "id": id.to_string(),
        "username": format!("user{id}"),
        "discriminator": "0001",
        "bot": id == BOT
    })
}

pub fn member(id: Snowflake, roles: &[Snowflake]) -> Value {
    let roles: Vec<String> = roles.iter().map(ToString::to_string).collect();
    json!({"user": user(id), "roles": roles, "joined_at": "2021-01-01T00:00:00Z"})
}

pub fn ready(guilds: &[Snowflake]) -> Value {
    let guilds: Vec<Value> = guilds
        .iter()
        .map(|g| json!({"id": g.to_string(), "unavailable": true}))
        .collect();
    json!({"v": 8, "user": user(BOT), "guilds": guilds, "session_id": "session-1"})
}

/// `G1` with the bot and `U1` as members
pub fn guild_g1() -> Value {
    json!({
        "id": G1.to_string(),
        "name": "G1",
        "owner_id": U1.to_string(),
        "roles": [{"id": R1.to_string(), "name": "R1", "permissions": "0"}],
        "channels": [
            {"id": C1.to_string(), "type": 0, "name": "C1"},
            {"id": C2.to_string(), "type": 2, "name": "C2"}
        ],
        "members": [member(BOT, &[]), member(U1, &[R1])],
        "voice_states": [],
        "presences": [{"user": {"id": U1.to_string()}, "status": "online"}]
    })
}

/// A second guild sharing `U1`
pub fn guild_g2() -> Value {
    json!({
        "id": G2.to_string(),
        "name": "G2",
        "owner_id": BOT.to_string(),
        "members": [member(BOT, &[]), member(U1, &[])]
    })
}

pub fn guild_delete(guild: Snowflake, unavailable: bool) -> Value {
    json!({"id": guild.to_string(), "unavailable": unavailable})
}

pub fn voice_state(guild: Snowflake, user_id: Snowflake, channel: Option<Snowflake>) -> Value {
    json!({
        "guild_id": guild.to_string(),
        "channel_id": channel.map(|c| c.to_string()),
        "user_id": user_id.to_string(),
        "session_id": format!("voice-session-{user_id}"),
        "self_mute": false,
        "self_deaf": false
    })
}

pub fn voice_server(guild: Snowflake) -> Value {
    json!({"guild_id": guild.to_string(), "token": "voice-token", "endpoint": "voice.test:443"})
}

pub fn member_update(guild: Snowflake, user_id: Snowflake, roles: &[Snowflake], nick: &str) -> Value {
    let roles: Vec<String> = roles.iter().map(ToString::to_string).collect();
    json!({"guild_id": guild.to_string(), "user": user(user_id), "roles": roles, "nick": nick})
}

pub fn member_remove(guild: Snowflake, user_id: Snowflake) -> Value {
    json!({"guild_id": guild.to_string(), "user": user(user_id)})
}

pub fn message(guild: Option<Snowflake>, channel: Snowflake, author: Snowflake, content: &str) -> Value {
    let mut body = json!({
        "id": "9000",
        "channel_id": channel.to_string(),
        "author": user(author),
        "content": content,
        "timestamp": "2021-01-01T00:00:00Z",
        "mentions": []
    });
    if let Some(guild) = guild {
        body["guild_id"] = json!(guild.to_string());
    }
    body
}
