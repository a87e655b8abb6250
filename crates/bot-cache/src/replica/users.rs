//! Reference-counted user table
//!
//! The table is not an authoritative store. A user stays cached only while
//! something structural (a guild member, the bot's own session) holds it;
//! dropping the last hold evicts the entry.

use std::collections::HashMap;

use bot_core::{Snowflake, User};

#[derive(Debug, Clone)]
struct UserEntry {
    user: User,
    holders: usize,
}

/// Process-wide user cache keyed by id
#[derive(Debug, Default, Clone)]
pub struct UserTable {
    entries: HashMap<Snowflake, UserEntry>,
}

impl UserTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a user and take one hold on it.
    ///
    /// Account fields are taken from `user`; presence data of an existing
    /// entry is kept.
    pub fn acquire(&mut self, user: User) {
        match self.entries.get_mut(&user.id) {
            Some(entry) => {
                entry.user.merge_account(&user);
                entry.holders += 1;
            }
            None => {
                self.entries.insert(user.id, UserEntry { user, holders: 1 });
            }
        }
    }

    /// Take one more hold on an already cached user
    pub fn retain(&mut self, id: Snowflake) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.holders += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one hold. Returns `true` when this evicted the user.
    pub fn release(&mut self, id: Snowflake) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders == 0 {
            self.entries.remove(&id);
            tracing::trace!(user_id = %id, "User evicted");
            return true;
        }
        false
    }

    /// Refresh account fields of a cached user without taking a hold.
    /// Returns the cached record, or `None` if the user is not held by anything.
    pub fn refresh(&mut self, user: &User) -> Option<&User> {
        let entry = self.entries.get_mut(&user.id)?;
        entry.user.merge_account(user);
        Some(&entry.user)
    }

    /// Mutate a cached user in place
    pub fn update<F>(&mut self, id: Snowflake, f: F) -> Option<&User>
    where
        F: FnOnce(&mut User),
    {
        let entry = self.entries.get_mut(&id)?;
        f(&mut entry.user);
        Some(&entry.user)
    }

    pub fn get(&self, id: Snowflake) -> Option<&User> {
        self.entries.get(&id).map(|e| &e.user)
    }

    #[inline]
    pub fn contains(&self, id: Snowflake) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of holds on a user (0 when not cached)
    pub fn holders(&self, id: Snowflake) -> usize {
        self.entries.get(&id).map_or(0, |e| e.holders)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.entries.values().map(|e| &e.user)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_core::OnlineStatus;

    fn user(id: i64, name: &str) -> User {
        User::new(Snowflake::new(id), name)
    }

    #[test]
    fn test_single_holder_eviction() {
        let mut table = UserTable::new();
        table.acquire(user(1, "alice"));
        assert_eq!(table.holders(Snowflake::new(1)), 1);

        assert!(table.release(Snowflake::new(1)));
        assert!(!table.contains(Snowflake::new(1)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_shared_user_survives_one_release() {
        let mut table = UserTable::new();
        table.acquire(user(1, "alice"));
        table.acquire(user(1, "alice"));

        assert!(!table.release(Snowflake::new(1)));
        assert!(table.contains(Snowflake::new(1)));
        assert!(table.release(Snowflake::new(1)));
        assert!(!table.contains(Snowflake::new(1)));
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let mut table = UserTable::new();
        assert!(!table.release(Snowflake::new(42)));
    }

    #[test]
    fn test_refresh_does_not_create() {
        let mut table = UserTable::new();
        assert!(table.refresh(&user(7, "ghost")).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_acquire_keeps_presence() {
        let mut table = UserTable::new();
        table.acquire(user(1, "alice"));
        table.update(Snowflake::new(1), |u| u.status = OnlineStatus::Idle);

        table.acquire(user(1, "alice2"));
        let cached = table.get(Snowflake::new(1)).unwrap();
        assert_eq!(cached.username, "alice2");
        assert_eq!(cached.status, OnlineStatus::Idle);
        assert_eq!(table.holders(Snowflake::new(1)), 2);
    }

    #[test]
    fn test_retain_requires_entry() {
        let mut table = UserTable::new();
        assert!(!table.retain(Snowflake::new(1)));
        table.acquire(user(1, "alice"));
        assert!(table.retain(Snowflake::new(1)));
        assert_eq!(table.holders(Snowflake::new(1)), 2);
    }
}
