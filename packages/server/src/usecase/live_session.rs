//! UseCase: ライブ位置共有
//!
//! Only the session envelope (id, active flag, timestamps) is stored on the
//! booking. Positions are relayed to `live:<sessionId>` and forgotten.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - start / stop の冪等性と担当ワーカーのみが操作できること
//! - 位置情報の中継（購読者へ届き、どこにも保存されないこと）
//!
//! ### どのような状況を想定しているか
//! - 正常系：開始 → 購読 → 位置送信 → 停止
//! - エッジケース：二重開始は同じ sessionId、未開始の停止は no-op
//! - 異常系：担当外ワーカー、存在しない予約、未購読接続からの送信
//! - 異常系：完了済みの予約での開始
//! - 競合：開始と予約完了が同時に走っても、どちらの書き込みも失われない

use std::sync::Arc;

use porchlight_shared::time::Clock;

use crate::domain::{
    BookingId, BookingRepository, ConnectionId, Coordinates, HubEvent, LiveSession,
    MessagePusher, RoomKey, RoomRegistry, SessionId, Timestamp, UserId,
};

use super::{booking_locks::BookingLocks, error::LiveSessionError};

/// ライブ位置共有のユースケース
pub struct LiveSessionUseCase {
    bookings: Arc<dyn BookingRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    registry: Arc<dyn RoomRegistry>,
    clock: Arc<dyn Clock>,
    booking_locks: Arc<BookingLocks>,
}

impl LiveSessionUseCase {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        registry: Arc<dyn RoomRegistry>,
        clock: Arc<dyn Clock>,
        booking_locks: Arc<BookingLocks>,
    ) -> Self {
        Self {
            bookings,
            message_pusher,
            registry,
            clock,
            booking_locks,
        }
    }

    /// `startSession`. Returns the running session id when one is already active.
    ///
    /// Completed, cancelled and rejected bookings cannot start tracking.
    pub async fn start_session(
        &self,
        booking_id: &BookingId,
        worker_id: &UserId,
    ) -> Result<SessionId, LiveSessionError> {
        self.booking_locks
            .run(booking_id, self.start_locked(booking_id, worker_id))
            .await
    }

    async fn start_locked(
        &self,
        booking_id: &BookingId,
        worker_id: &UserId,
    ) -> Result<SessionId, LiveSessionError> {
        let mut booking = self
            .bookings
            .find(booking_id)
            .await?
            .ok_or_else(|| LiveSessionError::BookingNotFound(booking_id.to_string()))?;
        if &booking.worker_id != worker_id {
            return Err(LiveSessionError::NotAssignedWorker);
        }
        if booking.status.ends_live_tracking() {
            return Err(LiveSessionError::BookingClosed(booking_id.to_string()));
        }

        if let Some(active) = booking.live_session.active_id() {
            tracing::debug!(booking_id = %booking_id, session_id = %active, "Live session already active");
            return Ok(active.clone());
        }

        let session_id = SessionId::generate();
        booking.live_session = LiveSession::start(session_id.clone(), self.now());
        self.bookings.save(booking).await?;
        tracing::info!(booking_id = %booking_id, session_id = %session_id, "Live session started");
        Ok(session_id)
    }

    /// `stopSession`. Stopping an inactive session is a no-op returning the
    /// envelope unchanged.
    pub async fn stop_session(
        &self,
        booking_id: &BookingId,
        worker_id: &UserId,
    ) -> Result<LiveSession, LiveSessionError> {
        self.booking_locks
            .run(booking_id, self.stop_locked(booking_id, worker_id))
            .await
    }

    async fn stop_locked(
        &self,
        booking_id: &BookingId,
        worker_id: &UserId,
    ) -> Result<LiveSession, LiveSessionError> {
        let mut booking = self
            .bookings
            .find(booking_id)
            .await?
            .ok_or_else(|| LiveSessionError::BookingNotFound(booking_id.to_string()))?;
        if &booking.worker_id != worker_id {
            return Err(LiveSessionError::NotAssignedWorker);
        }

        if !booking.live_session.stop(self.now()) {
            tracing::debug!(booking_id = %booking_id, "No active live session to stop");
            return Ok(booking.live_session);
        }

        let envelope = booking.live_session.clone();
        self.bookings.save(booking).await?;
        tracing::info!(
            booking_id = %booking_id,
            session_id = ?envelope.session_id.as_ref().map(|s| s.as_str()),
            "Live session stopped"
        );
        Ok(envelope)
    }

    /// `live:update`: relay a position to every member of the session room.
    ///
    /// With an `actor` the publishing connection must have joined the room.
    /// Nothing is persisted and an empty room is not an error.
    pub async fn publish_position(
        &self,
        connection_id: &ConnectionId,
        actor: Option<&UserId>,
        session_id: &SessionId,
        coords: Coordinates,
    ) -> Result<usize, LiveSessionError> {
        let room = RoomKey::live(session_id);
        if actor.is_some() && !self.registry.is_member(connection_id, &room).await {
            return Err(LiveSessionError::NotSubscribed(session_id.to_string()));
        }

        match self
            .message_pusher
            .emit(&room, &HubEvent::LiveUpdate { coords })
            .await
        {
            Ok(delivered) => Ok(delivered),
            Err(e) => {
                tracing::warn!(room = %room, "Failed to relay position: {}", e);
                Ok(0)
            }
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}
