//! Composition root.
//!
//! Dependencies are created in order:
//! 1. Repositories (in-memory stand-ins for the document store)
//! 2. Connection Hub
//! 3. UseCases
//! 4. AppState

use std::sync::Arc;

use porchlight_shared::time::Clock;

use crate::{
    config::HubConfig,
    domain::DedupGuard,
    infrastructure::{
        auth::JwtAuthenticator,
        message_pusher::WebSocketHub,
        repository::{
            InMemoryBookingRepository, InMemoryChatMessageRepository,
            InMemoryNotificationRepository,
        },
    },
    ui::AppState,
    usecase::{
        AdminStatsUseCase, BookingEventsUseCase, BookingLocks, ChatHistoryUseCase,
        ConnectionUseCase, LiveSessionUseCase, MessageStatusUseCase, NotifyUseCase,
        RoomAccessUseCase, SendMessageUseCase, TypingUseCase,
    },
};

/// Wire the whole hub with in-memory storage.
pub fn build_state(config: &HubConfig, clock: Arc<dyn Clock>) -> Arc<AppState> {
    // 1. Repositories
    let bookings = Arc::new(InMemoryBookingRepository::new());
    let messages = Arc::new(InMemoryChatMessageRepository::new());
    let notifications = Arc::new(InMemoryNotificationRepository::new());

    // 2. Connection Hub (MessagePusher + RoomRegistry)
    let hub = Arc::new(WebSocketHub::new());

    // 3. UseCases (one lock map for every writer of a booking)
    let booking_locks = Arc::new(BookingLocks::new());
    let dedup = DedupGuard::new(clock.clone(), config.dedup_window_ms, config.dedup_capacity);
    let notify_usecase = Arc::new(NotifyUseCase::new(
        notifications,
        hub.clone(),
        dedup,
        clock.clone(),
    ));
    let live_session_usecase = Arc::new(LiveSessionUseCase::new(
        bookings.clone(),
        hub.clone(),
        hub.clone(),
        clock.clone(),
        booking_locks.clone(),
    ));

    tracing::info!(
        room_access = %config.room_access,
        dedup_window_ms = config.dedup_window_ms,
        "Hub components initialised"
    );

    // 4. AppState
    Arc::new(AppState {
        authenticator: JwtAuthenticator::new(&config.jwt_secret),
        message_pusher: hub.clone(),
        registry: hub.clone(),
        connection_usecase: Arc::new(ConnectionUseCase::new(hub.clone())),
        room_access_usecase: Arc::new(RoomAccessUseCase::new(
            config.room_access,
            bookings.clone(),
            hub.clone(),
        )),
        send_message_usecase: Arc::new(SendMessageUseCase::new(
            bookings.clone(),
            messages.clone(),
            hub.clone(),
            clock.clone(),
            booking_locks.clone(),
        )),
        message_status_usecase: Arc::new(MessageStatusUseCase::new(
            bookings.clone(),
            messages.clone(),
            hub.clone(),
            clock.clone(),
        )),
        chat_history_usecase: Arc::new(ChatHistoryUseCase::new(bookings.clone(), messages)),
        typing_usecase: Arc::new(TypingUseCase::new(hub.clone(), hub.clone())),
        live_session_usecase,
        booking_events_usecase: Arc::new(BookingEventsUseCase::new(
            bookings,
            notify_usecase.clone(),
            clock.clone(),
            booking_locks,
        )),
        notify_usecase,
        admin_stats_usecase: Arc::new(AdminStatsUseCase::new(hub, clock)),
    })
}
