//! Infrastructure layer: store implementations, the WebSocket hub,
//! token verification and wire DTOs.

pub mod auth;
pub mod dto;
pub mod message_pusher;
pub mod repository;
