//! UseCase: チャット履歴の取得

use std::sync::Arc;

use crate::domain::{BookingId, BookingRepository, ChatMessage, ChatMessageRepository, UserId};

use super::error::ChatError;

/// チャット履歴取得のユースケース
pub struct ChatHistoryUseCase {
    bookings: Arc<dyn BookingRepository>,
    messages: Arc<dyn ChatMessageRepository>,
}

impl ChatHistoryUseCase {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        messages: Arc<dyn ChatMessageRepository>,
    ) -> Self {
        Self { bookings, messages }
    }

    /// Messages of the booking, oldest first. Only the booking's parties may read them.
    pub async fn execute(
        &self,
        requester: &UserId,
        booking_id: &BookingId,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let booking = self
            .bookings
            .find(booking_id)
            .await?
            .ok_or_else(|| ChatError::BookingNotFound(booking_id.to_string()))?;
        if !booking.is_party(requester) {
            return Err(ChatError::NotParticipant(requester.to_string()));
        }
        Ok(self.messages.list_for_booking(booking_id).await?)
    }
}
