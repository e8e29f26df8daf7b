//! Conversion logic between domain entities and DTOs.
//!
//! Only the domain → DTO direction exists: inbound payloads are validated
//! field by field in the use cases instead of being converted wholesale.

use crate::domain::{
    Booking, ChatMessage, Coordinates, HubEvent, LiveSession, Notification, UserId,
};
use crate::infrastructure::dto::{http, websocket as ws};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<ChatMessage> for ws::ChatMessageDto {
    fn from(model: ChatMessage) -> Self {
        let (file_url, file_type) = match model.attachment {
            Some(attachment) => (Some(attachment.url), attachment.file_type),
            None => (None, None),
        };
        Self {
            id: model.id.into_string(),
            booking_id: model.booking_id.into_string(),
            sender_id: model.sender_id.into_string(),
            receiver_id: model.receiver_id.into_string(),
            message: model.text,
            file_url,
            file_type,
            status: model.status,
            read_at: model.read_at.map(|t| t.value()),
            client_key: model.client_key.map(|k| k.into_string()),
            created_at: model.created_at.value(),
        }
    }
}

impl From<Notification> for ws::NotificationDto {
    fn from(model: Notification) -> Self {
        Self {
            id: model.id.into_string(),
            user_id: model.recipient_id.into_string(),
            actor_id: model.actor_id.map(|a| a.into_string()),
            kind: model.kind,
            title: model.title,
            message: model.message,
            data: model.data,
            read: model.read,
            created_at: model.created_at.value(),
        }
    }
}

impl From<Coordinates> for ws::CoordinatesDto {
    fn from(c: Coordinates) -> Self {
        Self { lat: c.lat, lng: c.lng }
    }
}

impl From<ws::CoordinatesDto> for Coordinates {
    fn from(c: ws::CoordinatesDto) -> Self {
        Self { lat: c.lat, lng: c.lng }
    }
}

impl From<LiveSession> for http::LiveSessionDto {
    fn from(model: LiveSession) -> Self {
        Self {
            session_id: model.session_id.map(|s| s.into_string()),
            active: model.active,
            started_at: model.started_at.map(|t| t.value()),
            stopped_at: model.stopped_at.map(|t| t.value()),
        }
    }
}

impl From<Booking> for http::BookingDto {
    fn from(model: Booking) -> Self {
        Self {
            id: model.id.into_string(),
            client_id: model.client_id.into_string(),
            worker_id: model.worker_id.into_string(),
            status: model.status,
            payment_status: model.payment_status,
            price: model.price,
            live_session: model.live_session.into(),
            created_at: model.created_at.value(),
        }
    }
}

impl From<&HubEvent> for ws::ServerEvent {
    fn from(event: &HubEvent) -> Self {
        match event.clone() {
            HubEvent::ChatNew(message) => Self::ChatNew(message.into()),
            HubEvent::ChatUpdate {
                message_id,
                status,
                file_url,
            } => Self::ChatUpdate(ws::ChatUpdatePayload {
                msg_id: message_id.into_string(),
                status,
                file_url,
            }),
            HubEvent::ChatUpdateBulk {
                booking_id,
                status,
                reader_id,
            } => Self::ChatUpdateBulk(ws::ChatUpdateBulkPayload {
                booking_id: booking_id.into_string(),
                status,
                reader_id: reader_id.map(UserId::into_string),
            }),
            HubEvent::ChatTyping { booking_id, from } => Self::ChatTyping(ws::TypingNotice {
                booking_id: booking_id.into_string(),
                from: from.into_string(),
            }),
            HubEvent::ChatStopTyping { booking_id, from } => {
                Self::ChatStopTyping(ws::TypingNotice {
                    booking_id: booking_id.into_string(),
                    from: from.into_string(),
                })
            }
            HubEvent::LiveUpdate { coords } => Self::LiveUpdate(ws::LivePositionPayload {
                coords: coords.into(),
            }),
            HubEvent::NotificationNew(notification) => Self::NotificationNew(notification.into()),
            HubEvent::AdminStatsUpdated(payload) => Self::AdminStatsUpdated(payload),
            HubEvent::Rejected { event, reason } => Self::Error(ws::ErrorPayload { event, reason }),
        }
    }
}

/// Encode an event as a wire frame.
pub fn encode_event(event: &HubEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(&ws::ServerEvent::from(event))
}
