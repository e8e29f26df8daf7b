//! WebSocket frame DTOs.
//!
//! Every frame is `{"event": <name>, "data": <payload>}`. Inbound and
//! outbound events are closed enums, so an unknown event name or a payload
//! with the wrong shape fails to decode and is dropped.

use serde::{Deserialize, Serialize};

use crate::domain::{FileType, MessageStatus, NotificationType};

// ========================================
// Client → Hub
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "auth")]
    Auth(AuthPayload),
    /// bookingId
    #[serde(rename = "joinChat")]
    JoinChat(String),
    /// bookingId
    #[serde(rename = "leaveChat")]
    LeaveChat(String),
    /// userId
    #[serde(rename = "joinNotifications")]
    JoinNotifications(String),
    /// userId
    #[serde(rename = "leaveNotifications")]
    LeaveNotifications(String),
    #[serde(rename = "chat:typing")]
    ChatTyping(TypingPayload),
    #[serde(rename = "chat:stopTyping")]
    ChatStopTyping(TypingPayload),
    /// messageId
    #[serde(rename = "chat:delivered")]
    ChatDelivered(String),
    #[serde(rename = "chat:readOne")]
    ChatReadOne(ReadOnePayload),
    /// bookingId
    #[serde(rename = "chat:read")]
    ChatRead(String),
    #[serde(rename = "chat:fileUploaded")]
    ChatFileUploaded(FileUploadedPayload),
    #[serde(rename = "live:join")]
    LiveJoin(SessionPayload),
    #[serde(rename = "live:leave")]
    LiveLeave(SessionPayload),
    #[serde(rename = "live:update")]
    LiveUpdate(LiveUpdatePayload),
}

impl ClientEvent {
    /// Wire name, used when reporting a rejected event back to the sender.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::JoinChat(_) => "joinChat",
            Self::LeaveChat(_) => "leaveChat",
            Self::JoinNotifications(_) => "joinNotifications",
            Self::LeaveNotifications(_) => "leaveNotifications",
            Self::ChatTyping(_) => "chat:typing",
            Self::ChatStopTyping(_) => "chat:stopTyping",
            Self::ChatDelivered(_) => "chat:delivered",
            Self::ChatReadOne(_) => "chat:readOne",
            Self::ChatRead(_) => "chat:read",
            Self::ChatFileUploaded(_) => "chat:fileUploaded",
            Self::LiveJoin(_) => "live:join",
            Self::LiveLeave(_) => "live:leave",
            Self::LiveUpdate(_) => "live:update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub booking_id: String,
    /// Ignored when the connection is authenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOnePayload {
    pub booking_id: String,
    pub msg_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadedPayload {
    pub booking_id: String,
    pub msg_id: String,
    pub file_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatesDto {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUpdatePayload {
    pub session_id: String,
    pub coords: CoordinatesDto,
}

// ========================================
// Hub → Client
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "chat:new")]
    ChatNew(ChatMessageDto),
    #[serde(rename = "chat:update")]
    ChatUpdate(ChatUpdatePayload),
    #[serde(rename = "chat:updateBulk")]
    ChatUpdateBulk(ChatUpdateBulkPayload),
    #[serde(rename = "chat:typing")]
    ChatTyping(TypingNotice),
    #[serde(rename = "chat:stopTyping")]
    ChatStopTyping(TypingNotice),
    #[serde(rename = "live:update")]
    LiveUpdate(LivePositionPayload),
    #[serde(rename = "notification:new")]
    NotificationNew(NotificationDto),
    #[serde(rename = "admin:statsUpdated")]
    AdminStatsUpdated(serde_json::Value),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

/// Persisted chat message as sent to clients and returned by REST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: String,
    pub booking_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub file_url: Option<String>,
    pub file_type: Option<FileType>,
    pub status: MessageStatus,
    pub read_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUpdatePayload {
    pub msg_id: String,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUpdateBulkPayload {
    pub booking_id: String,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    pub booking_id: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePositionPayload {
    pub coords: CoordinatesDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub id: String,
    pub user_id: String,
    pub actor_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub event: String,
    pub reason: String,
}
