//! UseCase: 入力中インジケーターの中継
//!
//! Pure relay, nothing is stored. The event goes to every other member of
//! `chat:<bookingId>`; receivers expire the indicator on their own.

use std::sync::Arc;

use crate::domain::{
    BookingId, ConnectionId, HubEvent, MessagePusher, RoomKey, RoomRegistry, UserId,
    ValidationError,
};

use super::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Started,
    Stopped,
}

/// 入力中インジケーター中継のユースケース
pub struct TypingUseCase {
    message_pusher: Arc<dyn MessagePusher>,
    registry: Arc<dyn RoomRegistry>,
}

impl TypingUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, registry: Arc<dyn RoomRegistry>) -> Self {
        Self {
            message_pusher,
            registry,
        }
    }

    /// Relay a typing signal to the other members of the chat room.
    ///
    /// With an `actor` the connection must already be in the room and the
    /// relayed `from` is the actor, whatever the client claimed. Without one
    /// the claimed `from` is relayed as is.
    pub async fn relay(
        &self,
        connection_id: &ConnectionId,
        actor: Option<&UserId>,
        booking_id: &BookingId,
        claimed_from: Option<UserId>,
        signal: TypingSignal,
    ) -> Result<usize, ChatError> {
        let room = RoomKey::chat(booking_id);
        let from = match actor {
            Some(actor) => {
                if !self.registry.is_member(connection_id, &room).await {
                    return Err(ChatError::NotParticipant(actor.to_string()));
                }
                actor.clone()
            }
            None => claimed_from.ok_or(ChatError::Validation(ValidationError::Empty("from")))?,
        };

        let booking_id = booking_id.clone();
        let event = match signal {
            TypingSignal::Started => HubEvent::ChatTyping { booking_id, from },
            TypingSignal::Stopped => HubEvent::ChatStopTyping { booking_id, from },
        };

        match self
            .message_pusher
            .emit_except(&room, &event, connection_id)
            .await
        {
            Ok(delivered) => Ok(delivered),
            Err(e) => {
                tracing::warn!(room = %room, "Failed to relay {}: {}", event.name(), e);
                Ok(0)
            }
        }
    }
}
