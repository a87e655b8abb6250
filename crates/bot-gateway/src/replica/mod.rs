//! State replica
//!
//! Applies dispatched events to the shared cache and reports what changed.
//! Voice side effects and observer callbacks are left to whoever consumes
//! the returned [`Notification`].

mod handlers;
mod notification;
mod state_replica;

pub use notification::Notification;
pub use state_replica::StateReplica;
