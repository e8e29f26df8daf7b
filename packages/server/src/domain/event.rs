//! Events the hub pushes to connected clients.
//!
//! A closed set: every outbound frame is one of these variants. The wire
//! encoding lives in `infrastructure::dto::websocket`.

use super::{
    entity::{ChatMessage, MessageStatus, Notification},
    value_object::{BookingId, Coordinates, MessageId, UserId},
};

#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// `chat:new`
    ChatNew(ChatMessage),
    /// `chat:update`
    ChatUpdate {
        message_id: MessageId,
        status: MessageStatus,
        file_url: Option<String>,
    },
    /// `chat:updateBulk`
    ChatUpdateBulk {
        booking_id: BookingId,
        status: MessageStatus,
        /// Unset when an anonymous connection read the whole thread.
        reader_id: Option<UserId>,
    },
    /// `chat:typing`
    ChatTyping { booking_id: BookingId, from: UserId },
    /// `chat:stopTyping`
    ChatStopTyping { booking_id: BookingId, from: UserId },
    /// `live:update`
    LiveUpdate { coords: Coordinates },
    /// `notification:new`
    NotificationNew(Notification),
    /// `admin:statsUpdated`
    AdminStatsUpdated(serde_json::Value),
    /// `error`, sent only to the connection whose inbound event was rejected
    Rejected { event: String, reason: String },
}

impl HubEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatNew(_) => "chat:new",
            Self::ChatUpdate { .. } => "chat:update",
            Self::ChatUpdateBulk { .. } => "chat:updateBulk",
            Self::ChatTyping { .. } => "chat:typing",
            Self::ChatStopTyping { .. } => "chat:stopTyping",
            Self::LiveUpdate { .. } => "live:update",
            Self::NotificationNew(_) => "notification:new",
            Self::AdminStatsUpdated(_) => "admin:statsUpdated",
            Self::Rejected { .. } => "error",
        }
    }
}
