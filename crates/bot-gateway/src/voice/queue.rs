//! Per-guild playback queue

use std::collections::VecDeque;

use bot_core::{SharedAudioSource, Snowflake, SongInfo};

/// How to pick a queued item for removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSelector {
    /// Zero-based position
    Index(usize),
    /// Title, compared case-insensitively
    Name(String),
}

impl From<usize> for QueueSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for QueueSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// One queued item
#[derive(Debug, Clone)]
pub enum QueueEntry {
    /// Playable as is
    Ready(SharedAudioSource),
    /// Must go through the song resolver before it can play
    Requested(SongInfo),
}

impl QueueEntry {
    pub fn title(&self) -> &str {
        match self {
            Self::Ready(source) => source.title(),
            Self::Requested(song) => &song.name,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl From<SharedAudioSource> for QueueEntry {
    fn from(source: SharedAudioSource) -> Self {
        Self::Ready(source)
    }
}

impl From<SongInfo> for QueueEntry {
    fn from(song: SongInfo) -> Self {
        Self::Requested(song)
    }
}

/// Ordered pending audio items for one guild
#[derive(Debug, Clone)]
pub struct PlaybackQueue {
    guild_id: Snowflake,
    items: VecDeque<QueueEntry>,
}

impl PlaybackQueue {
    /// Create an empty queue for `guild_id`
    pub fn new(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            items: VecDeque::new(),
        }
    }

    pub fn guild_id(&self) -> Snowflake {
        self.guild_id
    }

    /// Append an item at the back
    pub fn push(&mut self, item: impl Into<QueueEntry>) {
        self.items.push_back(item.into());
    }

    /// Take the next item to play
    pub fn next(&mut self) -> Option<QueueEntry> {
        self.items.pop_front()
    }

    /// Whether `next` would return an item
    pub fn has_next(&self) -> bool {
        !self.items.is_empty()
    }

    /// Remove one item by position or title; the rest keep their order
    pub fn remove(&mut self, selector: &QueueSelector) -> Option<QueueEntry> {
        match selector {
            QueueSelector::Index(index) => self.items.remove(*index),
            QueueSelector::Name(name) => {
                let wanted = name.to_lowercase();
                let position = self
                    .items
                    .iter()
                    .position(|item| item.title().to_lowercase() == wanted)?;
                self.items.remove(position)
            }
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.items.iter()
    }

    /// Titles in play order
    pub fn titles(&self) -> Vec<String> {
        self.items.iter().map(|item| item.title().to_string()).collect()
    }
}
