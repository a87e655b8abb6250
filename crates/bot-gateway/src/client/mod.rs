//! Client facade
//!
//! Wires the connection, replica, bus and voice orchestrator together and
//! exposes the operations a bot author calls.

mod bot_client;
mod builder;
mod dispatch;
mod router;

pub use bot_client::BotClient;
pub use builder::{BotClientBuilder, NoopController};
