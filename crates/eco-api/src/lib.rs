//! REST surface and websocket upgrade for the EcoConnect realtime service.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod notifications;
pub mod presence;
pub mod router;
