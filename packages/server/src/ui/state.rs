//! Server state shared by every handler.

use std::sync::Arc;

use crate::{
    domain::{MessagePusher, RoomRegistry},
    infrastructure::auth::JwtAuthenticator,
    usecase::{
        AdminStatsUseCase, BookingEventsUseCase, ChatHistoryUseCase, ConnectionUseCase,
        LiveSessionUseCase, MessageStatusUseCase, NotifyUseCase, RoomAccessUseCase,
        SendMessageUseCase, TypingUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// JwtAuthenticator（トークン検証）
    pub authenticator: JwtAuthenticator,
    /// MessagePusher（接続へのイベント送信）
    pub message_pusher: Arc<dyn MessagePusher>,
    /// RoomRegistry（接続とルームの管理）
    pub registry: Arc<dyn RoomRegistry>,
    pub connection_usecase: Arc<ConnectionUseCase>,
    pub room_access_usecase: Arc<RoomAccessUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub message_status_usecase: Arc<MessageStatusUseCase>,
    pub chat_history_usecase: Arc<ChatHistoryUseCase>,
    pub typing_usecase: Arc<TypingUseCase>,
    pub live_session_usecase: Arc<LiveSessionUseCase>,
    pub notify_usecase: Arc<NotifyUseCase>,
    pub booking_events_usecase: Arc<BookingEventsUseCase>,
    pub admin_stats_usecase: Arc<AdminStatsUseCase>,
}
