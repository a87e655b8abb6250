//! Integration test utilities for the gateway bot
//!
//! Mock collaborators (REST, socket transport, voice, controller) and JSON
//! fixtures for driving a [`bot_gateway::BotClient`] end to end without a
//! network.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
