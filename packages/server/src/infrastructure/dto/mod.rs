//! Data Transfer Objects (DTOs) for the hub.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket frames in both directions
//! - `http`: REST request and response bodies

pub mod conversion;
pub mod http;
pub mod websocket;
