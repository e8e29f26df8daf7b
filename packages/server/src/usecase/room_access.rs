//! UseCase: ルームへの参加・離脱
//!
//! Rooms are joined by bare id over the wire. Under
//! [`RoomAccessPolicy::Verified`] the hub checks the authenticated user
//! against the booking before admitting the connection; under
//! [`RoomAccessPolicy::Open`] any connection may join any room.
//!
//! ## テスト実装の作業記録
//!
//! ### どのような状況を想定しているか
//! - 正常系：当事者によるチャット・ライブ・通知ルームへの参加
//! - 異常系：当事者でないユーザー、未認証接続、存在しない予約・セッション
//! - エッジケース：Open ポリシーでの通知ルーム参加によるユーザー紐付け

use std::{fmt, str::FromStr, sync::Arc};

use crate::domain::{
    BookingId, BookingRepository, ConnectionId, RoomKey, RoomRegistry, SessionId, UserId,
};

use super::error::RoomAccessError;

/// ルーム参加時の検証方針
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoomAccessPolicy {
    /// Joins require an authenticated user who belongs to the room.
    #[default]
    Verified,
    /// Joins by bare id, no ownership check.
    Open,
}

impl FromStr for RoomAccessPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verified" => Ok(Self::Verified),
            "open" => Ok(Self::Open),
            other => Err(format!(
                "unknown room access policy '{other}' (expected 'verified' or 'open')"
            )),
        }
    }
}

impl fmt::Display for RoomAccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verified => "verified",
            Self::Open => "open",
        })
    }
}

/// ルーム参加のユースケース
pub struct RoomAccessUseCase {
    policy: RoomAccessPolicy,
    bookings: Arc<dyn BookingRepository>,
    registry: Arc<dyn RoomRegistry>,
}

impl RoomAccessUseCase {
    pub fn new(
        policy: RoomAccessPolicy,
        bookings: Arc<dyn BookingRepository>,
        registry: Arc<dyn RoomRegistry>,
    ) -> Self {
        Self {
            policy,
            bookings,
            registry,
        }
    }

    pub fn policy(&self) -> RoomAccessPolicy {
        self.policy
    }

    /// User on whose behalf the connection acts.
    ///
    /// `Verified` requires an authenticated connection. `Open` never checks
    /// and returns `None`, so downstream use cases skip their party checks.
    pub async fn actor(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Option<UserId>, RoomAccessError> {
        match self.policy {
            RoomAccessPolicy::Open => Ok(None),
            RoomAccessPolicy::Verified => self
                .registry
                .user_of(connection_id)
                .await
                .map(Some)
                .ok_or(RoomAccessError::Unauthenticated),
        }
    }

    /// `joinChat`
    pub async fn join_chat(
        &self,
        connection_id: &ConnectionId,
        booking_id: &BookingId,
    ) -> Result<bool, RoomAccessError> {
        let room = RoomKey::chat(booking_id);
        if let Some(user) = self.actor(connection_id).await? {
            let booking = self
                .bookings
                .find(booking_id)
                .await?
                .ok_or_else(|| RoomAccessError::BookingNotFound(booking_id.to_string()))?;
            if !booking.is_party(&user) {
                return Err(forbidden(&user, &room));
            }
        }
        self.join(connection_id, room).await
    }

    /// `live:join`
    pub async fn join_live(
        &self,
        connection_id: &ConnectionId,
        session_id: &SessionId,
    ) -> Result<bool, RoomAccessError> {
        let room = RoomKey::live(session_id);
        if let Some(user) = self.actor(connection_id).await? {
            let booking = self
                .bookings
                .find_by_session(session_id)
                .await?
                .ok_or_else(|| RoomAccessError::SessionNotFound(session_id.to_string()))?;
            if !booking.is_party(&user) {
                return Err(forbidden(&user, &room));
            }
        }
        self.join(connection_id, room).await
    }

    /// `joinNotifications`
    ///
    /// Under `Open`, an unauthenticated connection becomes tied to `user_id`.
    pub async fn join_notifications(
        &self,
        connection_id: &ConnectionId,
        user_id: &UserId,
    ) -> Result<bool, RoomAccessError> {
        let room = RoomKey::notifications(user_id);
        match self.actor(connection_id).await? {
            Some(user) if &user != user_id => return Err(forbidden(&user, &room)),
            Some(_) => {}
            None => {
                if self.registry.user_of(connection_id).await.is_none() {
                    self.registry
                        .authenticate(connection_id, user_id.clone())
                        .await?;
                }
            }
        }
        self.join(connection_id, room).await
    }

    /// `leaveChat` / `live:leave` / `leaveNotifications`. Never checked.
    pub async fn leave(&self, connection_id: &ConnectionId, room: &RoomKey) -> bool {
        let left = self.registry.leave(connection_id, room).await;
        if left {
            tracing::debug!(conn_id = %connection_id, room = %room, "Connection left room");
        }
        left
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        room: RoomKey,
    ) -> Result<bool, RoomAccessError> {
        let label = room.to_string();
        let joined = self.registry.join(connection_id, room).await?;
        if joined {
            tracing::info!(conn_id = %connection_id, room = %label, "Connection joined room");
        }
        Ok(joined)
    }
}

fn forbidden(user: &UserId, room: &RoomKey) -> RoomAccessError {
    RoomAccessError::Forbidden {
        user: user.to_string(),
        room: room.to_string(),
    }
}
