//! # bot-gateway
//!
//! Persistent gateway client: wire protocol, connection state machine with
//! heartbeat liveness and resume, the state replica, voice and playback
//! queue orchestration, and the [`BotClient`] facade tying them together.

pub mod bus;
pub mod client;
pub mod connection;
pub mod error;
pub mod events;
pub mod protocol;
pub mod replica;
pub mod rest;
pub mod voice;

pub use client::{BotClient, BotClientBuilder, NoopController};
pub use error::{GatewayError, GatewayResult};
