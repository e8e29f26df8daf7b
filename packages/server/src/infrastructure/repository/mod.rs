//! Repository 実装
//!
//! - `inmemory`: process-local stand-in for the document store

pub mod inmemory;

pub use inmemory::{
    InMemoryBookingRepository, InMemoryChatMessageRepository, InMemoryNotificationRepository,
};
