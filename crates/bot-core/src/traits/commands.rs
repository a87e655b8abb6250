//! Persisted per-guild command preferences

use super::RepoResult;
use crate::value_objects::Snowflake;

/// Read/write accessors over command-role permissions and custom prefixes.
/// Implementations own their storage; callers never touch it directly.
pub trait CommandsConfig: Send + Sync {
    /// Grant roles to a command (duplicates are ignored)
    fn add_roles(&self, guild_id: Snowflake, command: &str, roles: &[String]) -> RepoResult<()>;

    fn get_roles(&self, guild_id: Snowflake, command: &str) -> Vec<String>;

    /// Revoke roles; a command with no roles left is dropped
    fn remove_roles(&self, guild_id: Snowflake, command: &str, roles: &[String])
        -> RepoResult<()>;

    fn delete_command(&self, guild_id: Snowflake, command: &str) -> RepoResult<()>;

    fn change_prefix(&self, guild_id: Snowflake, prefix: &str) -> RepoResult<()>;

    fn remove_prefix(&self, guild_id: Snowflake) -> RepoResult<()>;

    fn get_prefix(&self, guild_id: Snowflake, default: &str) -> String;
}
