//! Entity 定義
//!
//! Bookings (with their embedded live session), chat messages and
//! notifications as the hub sees them. Booking is owned by the excluded
//! CRUD layer; only the fields the hub reads or writes are modelled.

use serde::{Deserialize, Serialize};

use super::value_object::{
    Attachment, BookingId, ClientKey, MessageContent, MessageId, NotificationId, SessionId,
    Timestamp, UserId,
};

// ========================================
// Booking
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Arrived,
    Rejected,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Chat is open once the worker accepted, and stays open after completion.
    pub fn permits_chat(&self) -> bool {
        matches!(self, Self::Accepted | Self::Arrived | Self::Completed)
    }

    /// Statuses after which live tracking makes no sense any more.
    pub fn ends_live_tracking(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Arrived => "arrived",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }
}

/// Live tracking envelope embedded in a booking.
///
/// Only the envelope is durable; positions never are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSession {
    pub session_id: Option<SessionId>,
    pub active: bool,
    pub started_at: Option<Timestamp>,
    pub stopped_at: Option<Timestamp>,
}

impl LiveSession {
    /// The id of the running session, if any.
    pub fn active_id(&self) -> Option<&SessionId> {
        if self.active {
            self.session_id.as_ref()
        } else {
            None
        }
    }

    pub fn start(session_id: SessionId, now: Timestamp) -> Self {
        Self {
            session_id: Some(session_id),
            active: true,
            started_at: Some(now),
            stopped_at: None,
        }
    }

    /// Returns `false` when there was nothing to stop.
    pub fn stop(&mut self, now: Timestamp) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.stopped_at = Some(now);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: BookingId,
    pub client_id: UserId,
    /// User account of the assigned worker
    pub worker_id: UserId,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub price: u64,
    pub live_session: LiveSession,
    pub created_at: Timestamp,
}

impl Booking {
    pub fn new(
        id: BookingId,
        client_id: UserId,
        worker_id: UserId,
        price: u64,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            client_id,
            worker_id,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            price,
            live_session: LiveSession::default(),
            created_at,
        }
    }

    /// Whether the user is the client or the worker of this booking.
    pub fn is_party(&self, user_id: &UserId) -> bool {
        &self.client_id == user_id || &self.worker_id == user_id
    }

    /// The other side of the conversation for `user_id`.
    pub fn counterpart_of(&self, user_id: &UserId) -> Option<&UserId> {
        if &self.client_id == user_id {
            Some(&self.worker_id)
        } else if &self.worker_id == user_id {
            Some(&self.client_id)
        } else {
            None
        }
    }
}

// ========================================
// ChatMessage
// ========================================

/// Server-side lifecycle of a chat message.
///
/// `sending` and `failed` exist only on the client and are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub booking_id: BookingId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: String,
    pub attachment: Option<Attachment>,
    pub status: MessageStatus,
    pub read_at: Option<Timestamp>,
    pub client_key: Option<ClientKey>,
    pub created_at: Timestamp,
}

impl ChatMessage {
    /// A freshly persisted message always starts at `sent`.
    pub fn new(
        booking_id: BookingId,
        sender_id: UserId,
        receiver_id: UserId,
        content: MessageContent,
        client_key: Option<ClientKey>,
        created_at: Timestamp,
    ) -> Self {
        let (text, attachment) = content.into_parts();
        Self {
            id: MessageId::generate(),
            booking_id,
            sender_id,
            receiver_id,
            text,
            attachment,
            status: MessageStatus::Sent,
            read_at: None,
            client_key,
            created_at,
        }
    }

    /// Move the status forward to `target`.
    ///
    /// Returns `false` and leaves the message untouched when `target` is not
    /// ahead of the current status.
    pub fn advance(&mut self, target: MessageStatus, now: Timestamp) -> bool {
        if target <= self.status {
            return false;
        }
        self.status = target;
        if target == MessageStatus::Read {
            self.read_at = Some(now);
        }
        true
    }
}

// ========================================
// Notification
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BookingRequest,
    BookingUpdate,
    NewReview,
    PaymentUpdate,
    PaymentSuccess,
    General,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookingRequest => "booking_request",
            Self::BookingUpdate => "booking_update",
            Self::NewReview => "new_review",
            Self::PaymentUpdate => "payment_update",
            Self::PaymentSuccess => "payment_success",
            Self::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub actor_id: Option<UserId>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    /// Deep-link payload, e.g. `{"bookingId": "..."}`
    pub data: serde_json::Value,
    pub read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    /// Identifier used to tell apart notifications that share a title,
    /// taken from `data.bookingId`.
    pub fn correlating_id(&self) -> &str {
        self.data
            .get("bookingId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id<T: TryFrom<String>>(raw: &str) -> T
    where
        T::Error: std::fmt::Debug,
    {
        T::try_from(raw.to_string()).unwrap()
    }

    fn message() -> ChatMessage {
        ChatMessage::new(
            id("b1"),
            id("client"),
            id("worker"),
            MessageContent::new(Some("hello".to_string()), None).unwrap(),
            None,
            Timestamp::new(1_000),
        )
    }

    #[test]
    fn test_only_accepted_arrived_completed_permit_chat() {
        // テスト項目: accepted / arrived / completed のみチャット可能
        // then (期待する結果):
        assert!(BookingStatus::Accepted.permits_chat());
        assert!(BookingStatus::Arrived.permits_chat());
        assert!(BookingStatus::Completed.permits_chat());
        assert!(!BookingStatus::Pending.permits_chat());
        assert!(!BookingStatus::Rejected.permits_chat());
        assert!(!BookingStatus::Cancelled.permits_chat());
    }

    #[test]
    fn test_new_message_starts_as_sent() {
        // when (操作):
        let msg = message();

        // then (期待する結果):
        assert_eq!(msg.status, MessageStatus::Sent);
        assert_eq!(msg.read_at, None);
    }

    #[test]
    fn test_advance_moves_forward_only() {
        // テスト項目: ステータスは前進のみ（read → delivered には戻らない）
        // given (前提条件):
        let mut msg = message();

        // when (操作):
        let to_read = msg.advance(MessageStatus::Read, Timestamp::new(2_000));
        let back_to_delivered = msg.advance(MessageStatus::Delivered, Timestamp::new(3_000));

        // then (期待する結果):
        assert!(to_read);
        assert!(!back_to_delivered);
        assert_eq!(msg.status, MessageStatus::Read);
        assert_eq!(msg.read_at, Some(Timestamp::new(2_000)));
    }

    #[test]
    fn test_advance_to_same_status_is_noop() {
        // given (前提条件):
        let mut msg = message();
        msg.advance(MessageStatus::Delivered, Timestamp::new(2_000));

        // when (操作):
        let changed = msg.advance(MessageStatus::Delivered, Timestamp::new(3_000));

        // then (期待する結果):
        assert!(!changed);
        assert_eq!(msg.status, MessageStatus::Delivered);
    }

    #[test]
    fn test_counterpart_of() {
        // given (前提条件):
        let booking = Booking::new(id("b1"), id("c"), id("w"), 500, Timestamp::new(0));

        // then (期待する結果):
        assert_eq!(booking.counterpart_of(&id("c")), Some(&id("w")));
        assert_eq!(booking.counterpart_of(&id("w")), Some(&id("c")));
        assert_eq!(booking.counterpart_of(&id("x")), None);
    }

    #[test]
    fn test_live_session_stop_is_idempotent() {
        // テスト項目: 停止済みセッションを再停止しても stopped_at は変わらない
        // given (前提条件):
        let mut session = LiveSession::start(SessionId::generate(), Timestamp::new(10));
        session.stop(Timestamp::new(20));

        // when (操作):
        let stopped_again = session.stop(Timestamp::new(30));

        // then (期待する結果):
        assert!(!stopped_again);
        assert_eq!(session.stopped_at, Some(Timestamp::new(20)));
        assert_eq!(session.active_id(), None);
    }

    #[test]
    fn test_correlating_id_reads_booking_id() {
        // given (前提条件):
        let mut notification = Notification {
            id: NotificationId::generate(),
            recipient_id: id("u1"),
            actor_id: None,
            kind: NotificationType::BookingUpdate,
            title: "Booking accepted".to_string(),
            message: String::new(),
            data: serde_json::json!({ "bookingId": "b9" }),
            read: false,
            created_at: Timestamp::new(0),
        };

        // then (期待する結果):
        assert_eq!(notification.correlating_id(), "b9");
        notification.data = serde_json::json!({});
        assert_eq!(notification.correlating_id(), "");
    }
}
