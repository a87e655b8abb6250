//! Voice transport ports
//!
//! The audio transport of a single voice connection is a black box: it
//! accepts start/pause/resume/stop and reports back when an item finished.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::RepoResult;
use crate::value_objects::Snowflake;

/// A playable audio item
pub trait AudioSource: Send + Sync + fmt::Debug {
    /// Human-readable title, used for queue lookups by name
    fn title(&self) -> &str;
}

pub type SharedAudioSource = Arc<dyn AudioSource>;

/// A queued song that still has to be turned into audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongInfo {
    pub name: String,
    /// Where the audio comes from (URL, search term, file)
    pub source: String,
    pub requested_by: Option<Snowflake>,
}

impl SongInfo {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            requested_by: None,
        }
    }

    #[must_use]
    pub fn requested_by(mut self, user_id: Snowflake) -> Self {
        self.requested_by = Some(user_id);
        self
    }
}

/// Prepares queued songs for playback
///
/// Resolution may take a while (download, transcode); it runs off the caller's
/// task and its outcome is reported back to the orchestrator.
#[async_trait]
pub trait SongResolver: Send + Sync {
    async fn resolve(&self, guild_id: Snowflake, song: SongInfo) -> RepoResult<SharedAudioSource>;
}

/// Fired by a connection with its guild id when the current item finished
pub type SpeakingFinished = Arc<dyn Fn(Snowflake) + Send + Sync>;

/// Everything needed to open the per-guild audio transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceServerInfo {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    /// The bot's own voice session id
    pub session_id: String,
    pub token: String,
    pub endpoint: Option<String>,
}

/// Live audio transport for one guild
pub trait VoiceConnection: Send + Sync {
    fn start_speaking(&self, source: SharedAudioSource);

    fn pause_speaking(&self);

    fn resume_speaking(&self);

    fn stop_speaking(&self);

    /// Item currently loaded, paused or playing
    fn current_source(&self) -> Option<SharedAudioSource>;

    fn is_speaking(&self) -> bool;

    /// Close the transport; the connection is unusable afterwards
    fn disconnect(&self);
}

/// Factory for voice connections
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn connect(
        &self,
        info: VoiceServerInfo,
        on_finished: SpeakingFinished,
    ) -> RepoResult<Arc<dyn VoiceConnection>>;
}
