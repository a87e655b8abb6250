//! # bot-cache
//!
//! In-memory state for the gateway client.
//!
//! ## Features
//!
//! - **User table**: process-wide users with explicit holder counts; an entry
//!   is evicted as soon as its last holder lets go
//! - **Cache state**: active guilds and the unavailable set, kept disjoint
//! - **Command preferences**: per-guild command roles and prefixes persisted
//!   to flat JSON files
//!
//! ## Example
//!
//! ```ignore
//! use bot_cache::{CacheState, SharedCache};
//!
//! let cache = SharedCache::default();
//! let mut state = cache.write();
//! let outcome = state.insert_guild(guild, users);
//! ```

pub mod prefs;
pub mod replica;

pub use prefs::{CacheError, JsonCommandsConfig};
pub use replica::{CacheState, GuildInsert, RemovedMember, SharedCache, UserTable};
