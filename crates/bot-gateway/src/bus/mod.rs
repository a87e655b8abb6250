//! Event bus
//!
//! Moves work out of socket and timer callbacks onto a dispatcher task.

mod event_bus;
mod topics;

pub use event_bus::{BusSubscriber, EventBus};
pub use topics::{BusMessage, Topic};
