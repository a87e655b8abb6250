//! `GET /gateway/bot`

use bot_core::{RepoResult, RestClient};
use serde::Deserialize;

/// Socket endpoint and connection budget for this bot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayBotInfo {
    pub url: String,
    #[serde(default = "default_shards")]
    pub shards: u32,
    #[serde(default)]
    pub session_start_limit: SessionStartLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct SessionStartLimit {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub remaining: u32,
    /// Milliseconds until `remaining` resets
    #[serde(default)]
    pub reset_after: u64,
}

fn default_shards() -> u32 {
    1
}

impl GatewayBotInfo {
    pub const PATH: &'static str = "/gateway/bot";

    pub async fn fetch(rest: &dyn RestClient) -> RepoResult<Self> {
        rest.get(Self::PATH).await?.json()
    }

    /// Socket URL with the protocol version and encoding pinned
    pub fn socket_url(&self, version: u8) -> String {
        format!("{}/?v={version}&encoding=json", self.url.trim_end_matches('/'))
    }
}
