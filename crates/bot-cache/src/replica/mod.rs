//! Replicated object graph

mod state;
mod users;

use std::sync::Arc;

use parking_lot::RwLock;

pub use state::{CacheState, GuildInsert, RemovedMember};
pub use users::UserTable;

/// One lock domain over the whole graph
pub type SharedCache = Arc<RwLock<CacheState>>;
