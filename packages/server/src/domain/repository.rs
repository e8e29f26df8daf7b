//! Repository trait 定義
//!
//! The persistent store is an external collaborator. These traits are the
//! slice of it the hub relies on: single-document atomic writes and a few
//! queries. Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::{
    entity::{Booking, ChatMessage, MessageStatus, Notification},
    error::RepositoryError,
    value_object::{Attachment, BookingId, MessageId, NotificationId, SessionId, Timestamp, UserId},
};

/// Outcome of a forward-only status write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// The status moved forward; carries the updated message.
    Advanced(ChatMessage),
    /// The message was already at or past the target; carries it unchanged.
    Unchanged(ChatMessage),
}

impl StatusChange {
    pub fn message(&self) -> &ChatMessage {
        match self {
            Self::Advanced(m) | Self::Unchanged(m) => m,
        }
    }

    pub fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced(_))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;

    /// Booking whose live session carries `session_id`, active or not.
    async fn find_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// Insert or replace the booking document.
    async fn save(&self, booking: Booking) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    async fn insert(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError>;

    async fn find(&self, id: &MessageId) -> Result<Option<ChatMessage>, RepositoryError>;

    /// Messages of a booking, oldest first.
    async fn list_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;

    /// Atomically move one message forward to `target`.
    async fn advance_status(
        &self,
        id: &MessageId,
        target: MessageStatus,
        at: Timestamp,
    ) -> Result<StatusChange, RepositoryError>;

    /// Mark every unread message of the booking as read. Returns how many changed.
    async fn mark_all_read(
        &self,
        booking_id: &BookingId,
        at: Timestamp,
    ) -> Result<usize, RepositoryError>;

    /// Like [`mark_all_read`](Self::mark_all_read), limited to messages
    /// addressed to `receiver_id`.
    async fn mark_received_read(
        &self,
        booking_id: &BookingId,
        receiver_id: &UserId,
        at: Timestamp,
    ) -> Result<usize, RepositoryError>;

    async fn attach_file(
        &self,
        id: &MessageId,
        attachment: Attachment,
    ) -> Result<ChatMessage, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError>;

    /// Unread first, then newest first, at most `limit` entries.
    async fn list_for_recipient(
        &self,
        recipient_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError>;

    /// Mark one notification read; only matches when `recipient_id` owns it.
    async fn mark_read(
        &self,
        id: &NotificationId,
        recipient_id: &UserId,
    ) -> Result<Notification, RepositoryError>;

    async fn mark_all_read(&self, recipient_id: &UserId) -> Result<usize, RepositoryError>;

    async fn count_for_recipient(&self, recipient_id: &UserId) -> Result<usize, RepositoryError>;
}
