use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Booking, BookingId, BookingRepository, RepositoryError, SessionId};

/// インメモリ Booking Repository 実装
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: Mutex<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.bookings.lock().await.get(id).cloned())
    }

    async fn find_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let bookings = self.bookings.lock().await;
        Ok(bookings
            .values()
            .find(|b| b.live_session.session_id.as_ref() == Some(session_id))
            .cloned())
    }

    async fn save(&self, booking: Booking) -> Result<(), RepositoryError> {
        self.bookings
            .lock()
            .await
            .insert(booking.id.clone(), booking);
        Ok(())
    }
}
