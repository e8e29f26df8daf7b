//! InMemory Repository 実装
//!
//! Each repository guards its collection with a single `tokio::sync::Mutex`,
//! which gives the same single-document atomicity the real store offers.

mod booking;
mod chat_message;
mod notification;

pub use booking::InMemoryBookingRepository;
pub use chat_message::InMemoryChatMessageRepository;
pub use notification::InMemoryNotificationRepository;
