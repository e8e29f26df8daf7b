//! Real-time delivery layer for the porchlight home-services marketplace.
//!
//! One WebSocket hub multiplexes three kinds of rooms:
//! per-booking chat rooms (`chat:<bookingId>`), per-session live location
//! rooms (`live:<sessionId>`) and per-user notification rooms
//! (`notifications:<userId>`).

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// composition
pub mod bootstrap;
pub mod config;
