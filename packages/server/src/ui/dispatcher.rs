//! Inbound WebSocket event dispatch.
//!
//! One text frame is one [`ClientEvent`]. Frames that do not decode are
//! logged and dropped; events rejected by a use case are answered with an
//! `error` event to the sending connection only. Neither closes the socket.

use thiserror::Error;

use crate::{
    domain::{
        BookingId, ConnectionId, HubEvent, MessageId, RoomKey, SessionId, UserId,
        ValidationError,
    },
    infrastructure::dto::websocket::{
        AuthPayload, ClientEvent, FileUploadedPayload, LiveUpdatePayload, ReadOnePayload,
        SessionPayload, TypingPayload,
    },
    usecase::{ChatError, LiveSessionError, RoomAccessError, TypingSignal},
};

use super::state::AppState;

#[derive(Debug, Error)]
enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Access(#[from] RoomAccessError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Live(#[from] LiveSessionError),
}

/// Handle one inbound text frame from `connection_id`.
pub async fn dispatch_frame(state: &AppState, connection_id: &ConnectionId, frame: &str) {
    let event = match serde_json::from_str::<ClientEvent>(frame) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(conn_id = %connection_id, error = %e, "Dropping malformed frame");
            return;
        }
    };

    let name = event.name();
    tracing::debug!(conn_id = %connection_id, event = name, "Inbound event");

    if let Err(err) = handle_event(state, connection_id, event).await {
        tracing::warn!(conn_id = %connection_id, event = name, error = %err, "Inbound event rejected");
        let rejected = HubEvent::Rejected {
            event: name.to_string(),
            reason: err.to_string(),
        };
        if let Err(e) = state.message_pusher.push_to(connection_id, &rejected).await {
            tracing::debug!(conn_id = %connection_id, error = %e, "Could not report rejection");
        }
    }
}

async fn handle_event(
    state: &AppState,
    connection_id: &ConnectionId,
    event: ClientEvent,
) -> Result<(), DispatchError> {
    match event {
        ClientEvent::Auth(AuthPayload { token }) => {
            let user_id = state
                .authenticator
                .verify(&token)
                .map_err(|_| RoomAccessError::InvalidToken)?;
            state
                .connection_usecase
                .authenticate(connection_id, user_id)
                .await?;
        }
        ClientEvent::JoinChat(booking_id) => {
            let booking_id = BookingId::new(booking_id)?;
            state
                .room_access_usecase
                .join_chat(connection_id, &booking_id)
                .await?;
        }
        ClientEvent::LeaveChat(booking_id) => {
            let room = RoomKey::Chat(BookingId::new(booking_id)?);
            state.room_access_usecase.leave(connection_id, &room).await;
        }
        ClientEvent::JoinNotifications(user_id) => {
            let user_id = UserId::new(user_id)?;
            state
                .room_access_usecase
                .join_notifications(connection_id, &user_id)
                .await?;
        }
        ClientEvent::LeaveNotifications(user_id) => {
            let room = RoomKey::Notifications(UserId::new(user_id)?);
            state.room_access_usecase.leave(connection_id, &room).await;
        }
        ClientEvent::ChatTyping(payload) => {
            relay_typing(state, connection_id, payload, TypingSignal::Started).await?;
        }
        ClientEvent::ChatStopTyping(payload) => {
            relay_typing(state, connection_id, payload, TypingSignal::Stopped).await?;
        }
        ClientEvent::ChatDelivered(message_id) => {
            let message_id = MessageId::new(message_id)?;
            let actor = state.room_access_usecase.actor(connection_id).await?;
            state
                .message_status_usecase
                .mark_delivered(actor.as_ref(), &message_id)
                .await?;
        }
        ClientEvent::ChatReadOne(ReadOnePayload { msg_id, .. }) => {
            let message_id = MessageId::new(msg_id)?;
            let actor = state.room_access_usecase.actor(connection_id).await?;
            state
                .message_status_usecase
                .mark_read(actor.as_ref(), &message_id)
                .await?;
        }
        ClientEvent::ChatRead(booking_id) => {
            let booking_id = BookingId::new(booking_id)?;
            let actor = state.room_access_usecase.actor(connection_id).await?;
            state
                .message_status_usecase
                .mark_all_read(actor.as_ref(), &booking_id)
                .await?;
        }
        ClientEvent::ChatFileUploaded(FileUploadedPayload {
            booking_id,
            msg_id,
            file_url,
        }) => {
            let booking_id = BookingId::new(booking_id)?;
            let message_id = MessageId::new(msg_id)?;
            let actor = state.room_access_usecase.actor(connection_id).await?;
            state
                .message_status_usecase
                .attach_file(actor.as_ref(), &booking_id, &message_id, file_url)
                .await?;
        }
        ClientEvent::LiveJoin(SessionPayload { session_id }) => {
            let session_id = SessionId::new(session_id)?;
            state
                .room_access_usecase
                .join_live(connection_id, &session_id)
                .await?;
        }
        ClientEvent::LiveLeave(SessionPayload { session_id }) => {
            let room = RoomKey::Live(SessionId::new(session_id)?);
            state.room_access_usecase.leave(connection_id, &room).await;
        }
        ClientEvent::LiveUpdate(LiveUpdatePayload { session_id, coords }) => {
            let session_id = SessionId::new(session_id)?;
            let actor = state.room_access_usecase.actor(connection_id).await?;
            state
                .live_session_usecase
                .publish_position(connection_id, actor.as_ref(), &session_id, coords.into())
                .await?;
        }
    }
    Ok(())
}

async fn relay_typing(
    state: &AppState,
    connection_id: &ConnectionId,
    payload: TypingPayload,
    signal: TypingSignal,
) -> Result<(), DispatchError> {
    let booking_id = BookingId::new(payload.booking_id)?;
    let claimed_from = payload.from.map(UserId::new).transpose()?;
    let actor = state.room_access_usecase.actor(connection_id).await?;
    state
        .typing_usecase
        .relay(connection_id, actor.as_ref(), &booking_id, claimed_from, signal)
        .await?;
    Ok(())
}
