//! Realtime layer: presence registry, connection lifecycle and directed
//! notification delivery over websockets.

pub mod connection;
pub mod dispatcher;
pub mod notifier;
pub mod presence;

pub use connection::GatewayConfig;
pub use dispatcher::{ConnectionHandle, Dispatcher};
pub use notifier::{DurableNotifier, Notifier};
