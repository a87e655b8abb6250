//! Flat-file command preferences
//!
//! Two documents, rewritten on every change:
//! - commands: `{"<guild>": {"<command>": ["<role>", ...]}}`
//! - prefixes: `{"<guild>": "<prefix>"}`

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bot_core::{CommandsConfig, RepoResult, Snowflake};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::CacheError;

type CommandRoles = BTreeMap<String, BTreeMap<String, Vec<String>>>;
type Prefixes = BTreeMap<String, String>;

#[derive(Debug, Default)]
struct Documents {
    commands: CommandRoles,
    prefixes: Prefixes,
}

/// [`CommandsConfig`] backed by two JSON files
#[derive(Debug)]
pub struct JsonCommandsConfig {
    commands_path: PathBuf,
    prefixes_path: PathBuf,
    docs: RwLock<Documents>,
}

impl JsonCommandsConfig {
    /// Load both documents; a missing file reads as empty
    pub fn open(
        commands_path: impl Into<PathBuf>,
        prefixes_path: impl Into<PathBuf>,
    ) -> Result<Self, CacheError> {
        let commands_path = commands_path.into();
        let prefixes_path = prefixes_path.into();

        let docs = Documents {
            commands: load(&commands_path)?,
            prefixes: load(&prefixes_path)?,
        };
        tracing::debug!(
            commands = %commands_path.display(),
            guilds = docs.commands.len(),
            prefixes = docs.prefixes.len(),
            "Command preferences loaded"
        );

        Ok(Self {
            commands_path,
            prefixes_path,
            docs: RwLock::new(docs),
        })
    }

    /// Edit a copy, persist it, then swap it in; memory never runs ahead of disk
    fn mutate_commands<F>(&self, f: F) -> RepoResult<()>
    where
        F: FnOnce(&mut CommandRoles),
    {
        let mut docs = self.docs.write();
        let mut next = docs.commands.clone();
        f(&mut next);
        save(&self.commands_path, &next)?;
        docs.commands = next;
        Ok(())
    }

    fn mutate_prefixes<F>(&self, f: F) -> RepoResult<()>
    where
        F: FnOnce(&mut Prefixes),
    {
        let mut docs = self.docs.write();
        let mut next = docs.prefixes.clone();
        f(&mut next);
        save(&self.prefixes_path, &next)?;
        docs.prefixes = next;
        Ok(())
    }
}

impl CommandsConfig for JsonCommandsConfig {
    fn add_roles(&self, guild_id: Snowflake, command: &str, roles: &[String]) -> RepoResult<()> {
        self.mutate_commands(|commands| {
            let granted = commands
                .entry(guild_id.to_string())
                .or_default()
                .entry(command.to_string())
                .or_default();
            for role in roles {
                if !granted.contains(role) {
                    granted.push(role.clone());
                }
            }
        })
    }

    fn get_roles(&self, guild_id: Snowflake, command: &str) -> Vec<String> {
        self.docs
            .read()
            .commands
            .get(&guild_id.to_string())
            .and_then(|cmds| cmds.get(command))
            .cloned()
            .unwrap_or_default()
    }

    fn remove_roles(
        &self,
        guild_id: Snowflake,
        command: &str,
        roles: &[String],
    ) -> RepoResult<()> {
        self.mutate_commands(|commands| {
            let key = guild_id.to_string();
            let Some(cmds) = commands.get_mut(&key) else {
                return;
            };
            if let Some(granted) = cmds.get_mut(command) {
                granted.retain(|r| !roles.contains(r));
                if granted.is_empty() {
                    cmds.remove(command);
                }
            }
            if cmds.is_empty() {
                commands.remove(&key);
            }
        })
    }

    fn delete_command(&self, guild_id: Snowflake, command: &str) -> RepoResult<()> {
        self.mutate_commands(|commands| {
            let key = guild_id.to_string();
            if let Some(cmds) = commands.get_mut(&key) {
                cmds.remove(command);
                if cmds.is_empty() {
                    commands.remove(&key);
                }
            }
        })
    }

    fn change_prefix(&self, guild_id: Snowflake, prefix: &str) -> RepoResult<()> {
        self.mutate_prefixes(|prefixes| {
            prefixes.insert(guild_id.to_string(), prefix.to_string());
        })
    }

    fn remove_prefix(&self, guild_id: Snowflake) -> RepoResult<()> {
        self.mutate_prefixes(|prefixes| {
            prefixes.remove(&guild_id.to_string());
        })
    }

    fn get_prefix(&self, guild_id: Snowflake, default: &str) -> String {
        self.docs
            .read()
            .prefixes
            .get(&guild_id.to_string())
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

fn load<T>(path: &Path) -> Result<T, CacheError>
where
    T: DeserializeOwned + Default,
{
    match fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => Ok(T::default()),
        Ok(raw) => serde_json::from_str(&raw).map_err(|source| CacheError::Json {
            path: path.display().to_string(),
            source,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(CacheError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    let raw = serde_json::to_string_pretty(value).map_err(|source| CacheError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, raw).map_err(|source| CacheError::Io {
        path: path.display().to_string(),
        source,
    })
}
