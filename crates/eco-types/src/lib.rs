//! Shared types for the EcoConnect realtime service: persisted models,
//! websocket wire events and REST request/response bodies.

pub mod api;
pub mod events;
pub mod models;
