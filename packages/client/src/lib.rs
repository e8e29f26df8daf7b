//! Terminal client for the porchlight hub.
//!
//! The pure pieces ([`chat_view`], [`typing`], [`reconnect`]) hold the
//! client-side rules; [`session`] and [`runner`] wire them to a socket.

pub mod api;
pub mod chat_view;
pub mod error;
pub mod formatter;
pub mod reconnect;
pub mod runner;
pub mod session;
pub mod typing;
pub mod ui;

pub use error::ClientError;
pub use runner::{ClientConfig, run_client};
