//! Domain layer: value objects, entities and the seams to the outside world.

pub mod dedup;
pub mod entity;
pub mod error;
pub mod event;
pub mod pusher;
pub mod repository;
pub mod value_object;

pub use dedup::{DedupGuard, DedupKey};
pub use entity::{
    Booking, BookingStatus, ChatMessage, LiveSession, MessageStatus, Notification,
    NotificationType, PaymentStatus,
};
pub use error::{MessagePushError, RepositoryError, ValidationError};
pub use event::HubEvent;
pub use pusher::{MessagePusher, PusherChannel, RoomRegistry};
pub use repository::{
    BookingRepository, ChatMessageRepository, NotificationRepository, StatusChange,
};
pub use value_object::{
    Attachment, BookingId, ClientKey, ConnectionId, Coordinates, FileType, MessageContent,
    MessageId, NotificationId, RoomKey, SessionId, Timestamp, UserId,
};

#[cfg(test)]
pub use pusher::{MockMessagePusher, MockRoomRegistry};
#[cfg(test)]
pub use repository::{
    MockBookingRepository, MockChatMessageRepository, MockNotificationRepository,
};
