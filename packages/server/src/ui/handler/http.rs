//! HTTP API endpoint handlers.
//!
//! Thin stand-ins for the marketplace's CRUD controllers: each handler turns
//! the request into domain values, calls one use case and wraps the result
//! in [`ApiResponse`].

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{Attachment, BookingId, ClientKey, MessageContent, NotificationId, UserId},
    infrastructure::dto::{
        http::{
            ApiResponse, BookingDto, BroadcastCount, HealthResponse, LiveSessionDto,
            RegisterBookingRequest, SendMessageRequest, SessionStartedDto,
            UpdateBookingStatusRequest, UpdatePaymentRequest, UpdatedCount,
        },
        websocket::{ChatMessageDto, NotificationDto},
    },
    ui::{
        auth::AuthUser,
        error::{ApiError, ApiResult},
        state::AppState,
    },
    usecase::{RegisterBooking, SendMessageCommand},
};

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: state.registry.connection_count().await,
    })
}

// ========================================
// Chat
// ========================================

/// `GET /api/chat/{booking_id}`
pub async fn list_chat_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<ChatMessageDto>>>> {
    let booking_id = BookingId::new(booking_id)?;
    let messages = state
        .chat_history_usecase
        .execute(&user.user_id, &booking_id)
        .await?;

    // Domain Model から DTO への変換
    let data = messages.into_iter().map(ChatMessageDto::from).collect();
    Ok(Json(ApiResponse::ok("Messages fetched", data)))
}

/// `POST /api/chat/{booking_id}`
pub async fn send_chat_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ChatMessageDto>>)> {
    let attachment = request
        .file_url
        .map(|url| Attachment::new(url, request.file_type))
        .transpose()?;
    let command = SendMessageCommand {
        booking_id: BookingId::new(booking_id)?,
        sender_id: user.user_id,
        receiver_id: request.receiver_id.map(UserId::new).transpose()?,
        content: MessageContent::new(request.message, attachment)?,
        client_key: request.client_key.map(ClientKey::new).transpose()?,
    };

    let message = state.send_message_usecase.execute(command).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Message sent", message.into())),
    ))
}

// ========================================
// Notifications
// ========================================

/// `GET /api/notifications`
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<NotificationDto>>>> {
    let notifications = state.notify_usecase.list(&user.user_id).await?;
    let data = notifications
        .into_iter()
        .map(NotificationDto::from)
        .collect();
    Ok(Json(ApiResponse::ok("Notifications fetched", data)))
}

/// `PUT /api/notifications/{id}/read`
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<NotificationDto>>> {
    let id = NotificationId::new(id)?;
    let notification = state.notify_usecase.mark_read(&id, &user.user_id).await?;
    Ok(Json(ApiResponse::ok(
        "Notification marked as read",
        notification.into(),
    )))
}

/// `PUT /api/notifications/mark-all`
pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<UpdatedCount>>> {
    let updated = state.notify_usecase.mark_all_read(&user.user_id).await?;
    Ok(Json(ApiResponse::ok(
        "All notifications marked as read",
        UpdatedCount { updated },
    )))
}

// ========================================
// Bookings
// ========================================

/// `PUT /api/bookings/{id}/start-live`
pub async fn start_live_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> ApiResult<Json<ApiResponse<SessionStartedDto>>> {
    let booking_id = BookingId::new(booking_id)?;
    let session_id = state
        .live_session_usecase
        .start_session(&booking_id, &user.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Live session started",
        SessionStartedDto {
            session_id: session_id.into_string(),
        },
    )))
}

/// `PUT /api/bookings/{id}/stop-live`
pub async fn stop_live_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> ApiResult<Json<ApiResponse<LiveSessionDto>>> {
    let booking_id = BookingId::new(booking_id)?;
    let session = state
        .live_session_usecase
        .stop_session(&booking_id, &user.user_id)
        .await?;
    Ok(Json(ApiResponse::ok("Live session stopped", session.into())))
}

/// `POST /api/bookings`. The caller becomes the booking's client.
pub async fn register_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<RegisterBookingRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BookingDto>>)> {
    let request = RegisterBooking {
        booking_id: request.booking_id.map(BookingId::new).transpose()?,
        client_id: user.user_id,
        worker_id: UserId::new(request.worker_id)?,
        price: request.price,
    };
    let booking = state.booking_events_usecase.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Booking created", booking.into())),
    ))
}

/// `PUT /api/bookings/{id}/status`
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> ApiResult<Json<ApiResponse<BookingDto>>> {
    let booking_id = BookingId::new(booking_id)?;
    let booking = state
        .booking_events_usecase
        .update_status(&user.user_id, &booking_id, request.status)
        .await?;
    Ok(Json(ApiResponse::ok(
        format!("Booking {}", booking.status.as_str()),
        booking.into(),
    )))
}

/// `PUT /api/bookings/{id}/payment`
pub async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
    Json(request): Json<UpdatePaymentRequest>,
) -> ApiResult<Json<ApiResponse<BookingDto>>> {
    let booking_id = BookingId::new(booking_id)?;
    let booking = state
        .booking_events_usecase
        .update_payment(&user.user_id, &booking_id, request.payment_status)
        .await?;
    Ok(Json(ApiResponse::ok("Payment status updated", booking.into())))
}

// ========================================
// Admin
// ========================================

/// `POST /api/admin/stats/refresh`. An empty body sends only `updatedAt`.
pub async fn refresh_admin_stats(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<BroadcastCount>>> {
    let payload = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice::<serde_json::Value>(&body)
                .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?,
        )
    };
    let delivered = state
        .admin_stats_usecase
        .refresh(payload)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(ApiResponse::ok(
        "Stats refresh broadcast",
        BroadcastCount { delivered },
    )))
}
