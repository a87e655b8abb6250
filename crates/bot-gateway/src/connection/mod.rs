//! Gateway connection
//!
//! Socket lifecycle, handshake, heartbeat and resume policy.

mod connection;
mod heartbeat;
mod session;
mod state;
mod transport;

pub use connection::{ConnectionEvent, ConnectionSettings, GatewayConnection};
pub use session::Session;
pub use state::{AuthMode, ConnectionState};
pub use transport::{GatewayTransport, Inbound, Outbound, TransportHandle, WebSocketTransport};
