//! Utilities shared by the porchlight server and client.

pub mod logger;
pub mod time;
