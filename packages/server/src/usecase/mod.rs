//! UseCase 層
//!
//! One struct per operation group. Collaborators are injected as
//! `Arc<dyn Trait>` so each use case can be tested with in-memory
//! implementations or mocks.

pub mod admin_stats;
pub mod booking_events;
pub mod booking_locks;
pub mod chat_history;
pub mod connection;
pub mod error;
pub mod live_session;
pub mod message_status;
pub mod notify;
pub mod room_access;
pub mod send_message;
pub mod typing;

pub use admin_stats::AdminStatsUseCase;
pub use booking_events::{BookingEventsUseCase, RegisterBooking};
pub use booking_locks::BookingLocks;
pub use chat_history::ChatHistoryUseCase;
pub use connection::ConnectionUseCase;
pub use error::{
    BookingEventError, ChatError, ErrorKind, LiveSessionError, NotifyError, RoomAccessError,
};
pub use live_session::LiveSessionUseCase;
pub use message_status::MessageStatusUseCase;
pub use notify::{NOTIFICATION_LIST_LIMIT, NotifyCommand, NotifyOutcome, NotifyUseCase};
pub use room_access::{RoomAccessPolicy, RoomAccessUseCase};
pub use send_message::{SendMessageCommand, SendMessageUseCase};
pub use typing::{TypingSignal, TypingUseCase};
