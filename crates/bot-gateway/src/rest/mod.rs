//! REST collaborator
//!
//! [`HttpRestClient`] implements the core's `RestClient` port over HTTPS.

mod gateway_info;
mod http_client;
mod messages;

pub use gateway_info::{GatewayBotInfo, SessionStartLimit};
pub use http_client::HttpRestClient;
pub use messages::{CreateDirectChannel, CreateMessage};
