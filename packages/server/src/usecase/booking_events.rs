//! UseCase: 予約の状態変化と通知
//!
//! Thin stand-in for the booking controllers of the marketplace. Each
//! state change is stored first, then the counterpart is notified through
//! [`NotifyUseCase`]. A failed notification never fails the state change.
//!
//! ## テスト実装の作業記録
//!
//! ### どのような状況を想定しているか
//! - 正常系：予約登録 → ワーカーへ booking_request
//! - 正常系：ステータス更新 → クライアントへ booking_update
//! - 正常系：完了・キャンセル・拒否でライブセッションが止まる
//! - 正常系：支払い更新 → ワーカーへ payment_update
//! - 異常系：当事者以外の更新、重複した予約 ID

use std::sync::Arc;

use porchlight_shared::time::Clock;

use crate::domain::{
    Booking, BookingId, BookingRepository, BookingStatus, NotificationType, PaymentStatus,
    Timestamp, UserId,
};

use super::{
    booking_locks::BookingLocks,
    error::BookingEventError,
    notify::{NotifyCommand, NotifyUseCase},
};

/// 予約登録の内容
#[derive(Debug, Clone)]
pub struct RegisterBooking {
    pub booking_id: Option<BookingId>,
    pub client_id: UserId,
    pub worker_id: UserId,
    pub price: u64,
}

/// 予約イベントのユースケース
pub struct BookingEventsUseCase {
    bookings: Arc<dyn BookingRepository>,
    notify: Arc<NotifyUseCase>,
    clock: Arc<dyn Clock>,
    booking_locks: Arc<BookingLocks>,
}

impl BookingEventsUseCase {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        notify: Arc<NotifyUseCase>,
        clock: Arc<dyn Clock>,
        booking_locks: Arc<BookingLocks>,
    ) -> Self {
        Self {
            bookings,
            notify,
            clock,
            booking_locks,
        }
    }

    /// Register a pending booking and notify the worker.
    pub async fn register(&self, request: RegisterBooking) -> Result<Booking, BookingEventError> {
        let booking_id = request.booking_id.unwrap_or_else(BookingId::generate);
        let booking = self
            .booking_locks
            .run(&booking_id, async {
                if self.bookings.find(&booking_id).await?.is_some() {
                    return Err(BookingEventError::AlreadyExists(booking_id.to_string()));
                }
                let booking = Booking::new(
                    booking_id.clone(),
                    request.client_id,
                    request.worker_id,
                    request.price,
                    self.now(),
                );
                self.bookings.save(booking.clone()).await?;
                Ok::<_, BookingEventError>(booking)
            })
            .await?;
        tracing::info!(booking_id = %booking.id, worker_id = %booking.worker_id, "Booking registered");

        self.notify_quietly(NotifyCommand {
            recipient_id: booking.worker_id.clone(),
            actor_id: Some(booking.client_id.clone()),
            kind: NotificationType::BookingRequest,
            title: "New Booking Request".to_string(),
            message: format!("A client requested a job (₹{}).", booking.price),
            data: serde_json::json!({ "bookingId": booking.id.as_str() }),
        })
        .await;
        Ok(booking)
    }

    /// Update the booking status and notify the client.
    ///
    /// Completed, cancelled and rejected bookings stop any active live
    /// session; completion also resets the payment to pending.
    pub async fn update_status(
        &self,
        actor: &UserId,
        booking_id: &BookingId,
        status: BookingStatus,
    ) -> Result<Booking, BookingEventError> {
        let booking = self
            .booking_locks
            .run(booking_id, async {
                let mut booking = self.load_for_party(actor, booking_id).await?;
                booking.status = status;
                if status == BookingStatus::Completed {
                    booking.payment_status = PaymentStatus::Pending;
                }
                if status.ends_live_tracking() && booking.live_session.stop(self.now()) {
                    tracing::info!(booking_id = %booking_id, "Live session stopped with booking");
                }
                self.bookings.save(booking.clone()).await?;
                Ok::<_, BookingEventError>(booking)
            })
            .await?;
        tracing::info!(booking_id = %booking_id, status = status.as_str(), "Booking status updated");

        self.notify_quietly(NotifyCommand {
            recipient_id: booking.client_id.clone(),
            actor_id: Some(booking.worker_id.clone()),
            kind: NotificationType::BookingUpdate,
            title: format!("Booking {}", status.as_str()),
            message: format!("Worker updated booking status to {}.", status.as_str()),
            data: serde_json::json!({ "bookingId": booking.id.as_str() }),
        })
        .await;
        Ok(booking)
    }

    /// Update the payment status and notify the worker.
    pub async fn update_payment(
        &self,
        actor: &UserId,
        booking_id: &BookingId,
        payment_status: PaymentStatus,
    ) -> Result<Booking, BookingEventError> {
        let booking = self
            .booking_locks
            .run(booking_id, async {
                let mut booking = self.load_for_party(actor, booking_id).await?;
                booking.payment_status = payment_status;
                self.bookings.save(booking.clone()).await?;
                Ok::<_, BookingEventError>(booking)
            })
            .await?;
        tracing::info!(booking_id = %booking_id, payment_status = payment_status.as_str(), "Payment status updated");

        let message = match payment_status {
            PaymentStatus::Paid => format!("Client completed payment of ₹{}.", booking.price),
            other => format!("Client's payment {}.", other.as_str()),
        };
        self.notify_quietly(NotifyCommand {
            recipient_id: booking.worker_id.clone(),
            actor_id: Some(booking.client_id.clone()),
            kind: NotificationType::PaymentUpdate,
            title: format!("Payment {}", payment_status.as_str()),
            message,
            data: serde_json::json!({ "bookingId": booking.id.as_str() }),
        })
        .await;
        Ok(booking)
    }

    async fn load_for_party(
        &self,
        actor: &UserId,
        booking_id: &BookingId,
    ) -> Result<Booking, BookingEventError> {
        let booking = self
            .bookings
            .find(booking_id)
            .await?
            .ok_or_else(|| BookingEventError::NotFound(booking_id.to_string()))?;
        if !booking.is_party(actor) {
            return Err(BookingEventError::NotParticipant(actor.to_string()));
        }
        Ok(booking)
    }

    async fn notify_quietly(&self, command: NotifyCommand) {
        let recipient = command.recipient_id.clone();
        if let Err(e) = self.notify.execute(command).await {
            tracing::warn!(recipient_id = %recipient, "Failed to notify: {}", e);
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        DedupGuard, LiveSession, MockMessagePusher, NotificationRepository, SessionId,
        dedup::{DEFAULT_DEDUP_CAPACITY, DEFAULT_DEDUP_WINDOW_MS},
    };
    use crate::infrastructure::repository::{
        InMemoryBookingRepository, InMemoryNotificationRepository,
    };
    use crate::usecase::test_support::{booking_id, seed_booking, user};
    use porchlight_shared::time::FixedClock;

    struct Fixture {
        usecase: BookingEventsUseCase,
        bookings: Arc<InMemoryBookingRepository>,
        notifications: Arc<InMemoryNotificationRepository>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new(5_000));
        let bookings = Arc::new(InMemoryBookingRepository::new());
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let mut pusher = MockMessagePusher::new();
        pusher.expect_emit().returning(|_, _| Ok(0));
        let notify = Arc::new(NotifyUseCase::new(
            notifications.clone(),
            Arc::new(pusher),
            DedupGuard::new(clock.clone(), DEFAULT_DEDUP_WINDOW_MS, DEFAULT_DEDUP_CAPACITY),
            clock.clone(),
        ));
        Fixture {
            usecase: BookingEventsUseCase::new(bookings.clone(), notify, clock, Arc::default()),
            bookings,
            notifications,
        }
    }

    #[tokio::test]
    async fn test_register_notifies_worker() {
        // テスト項目: 予約登録でワーカーに booking_request 通知が保存される
        // given (前提条件):
        let f = fixture();

        // when (操作):
        let booking = f
            .usecase
            .register(RegisterBooking {
                booking_id: Some(booking_id("b1")),
                client_id: user("client"),
                worker_id: user("worker"),
                price: 700,
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(booking.status, BookingStatus::Pending);
        let listed = f
            .notifications
            .list_for_recipient(&user("worker"), 10)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, NotificationType::BookingRequest);
        assert_eq!(listed[0].correlating_id(), "b1");
    }

    #[tokio::test]
    async fn test_register_duplicate_id_conflicts() {
        // given (前提条件):
        let f = fixture();
        seed_booking(&*f.bookings, "b1", "client", "worker", BookingStatus::Pending).await;

        // when (操作):
        let result = f
            .usecase
            .register(RegisterBooking {
                booking_id: Some(booking_id("b1")),
                client_id: user("client"),
                worker_id: user("worker"),
                price: 0,
            })
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(BookingEventError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_status_update_notifies_client() {
        // テスト項目: ステータス更新でクライアントに booking_update が届く
        // given (前提条件):
        let f = fixture();
        seed_booking(&*f.bookings, "b1", "client", "worker", BookingStatus::Pending).await;

        // when (操作):
        let booking = f
            .usecase
            .update_status(&user("worker"), &booking_id("b1"), BookingStatus::Accepted)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(booking.status, BookingStatus::Accepted);
        let listed = f
            .notifications
            .list_for_recipient(&user("client"), 10)
            .await
            .unwrap();
        assert_eq!(listed[0].title, "Booking accepted");
        assert_eq!(listed[0].kind, NotificationType::BookingUpdate);
    }

    #[tokio::test]
    async fn test_completion_stops_live_session() {
        // テスト項目: 完了でアクティブなライブセッションが止まる
        // given (前提条件):
        let f = fixture();
        seed_booking(&*f.bookings, "b1", "client", "worker", BookingStatus::Arrived).await;
        let mut booking = f.bookings.find(&booking_id("b1")).await.unwrap().unwrap();
        booking.live_session = LiveSession::start(SessionId::generate(), Timestamp::new(1));
        booking.payment_status = PaymentStatus::Failed;
        f.bookings.save(booking).await.unwrap();

        // when (操作):
        let booking = f
            .usecase
            .update_status(&user("worker"), &booking_id("b1"), BookingStatus::Completed)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!booking.live_session.active);
        assert_eq!(booking.live_session.stopped_at, Some(Timestamp::new(5_000)));
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_payment_update_notifies_worker() {
        // given (前提条件):
        let f = fixture();
        seed_booking(&*f.bookings, "b1", "client", "worker", BookingStatus::Completed).await;

        // when (操作):
        f.usecase
            .update_payment(&user("client"), &booking_id("b1"), PaymentStatus::Paid)
            .await
            .unwrap();

        // then (期待する結果):
        let listed = f
            .notifications
            .list_for_recipient(&user("worker"), 10)
            .await
            .unwrap();
        assert_eq!(listed[0].kind, NotificationType::PaymentUpdate);
        assert_eq!(listed[0].title, "Payment paid");
    }

    #[tokio::test]
    async fn test_stranger_cannot_update() {
        // given (前提条件):
        let f = fixture();
        seed_booking(&*f.bookings, "b1", "client", "worker", BookingStatus::Pending).await;

        // when (操作):
        let result = f
            .usecase
            .update_status(&user("mallory"), &booking_id("b1"), BookingStatus::Cancelled)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(BookingEventError::NotParticipant(_))));
    }
}
