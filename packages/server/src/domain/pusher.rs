//! Connection Hub trait 定義
//!
//! `MessagePusher` is the broadcast primitive the use cases push through;
//! `RoomRegistry` is the membership table behind it. Both are implemented
//! by the infrastructure layer (`WebSocketHub`).

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    event::HubEvent,
    value_object::{ConnectionId, RoomKey, UserId},
};

/// Outbound channel of a single connection (already-encoded frames)
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Broadcast side of the hub.
///
/// Every method returns the number of connections the event was handed to.
/// An empty room is not an error: offline recipients catch up from the
/// persisted notification list and chat history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Deliver to every member of `room`.
    async fn emit(&self, room: &RoomKey, event: &HubEvent) -> Result<usize, MessagePushError>;

    /// Deliver to every member of `room` except `sender`.
    async fn emit_except(
        &self,
        room: &RoomKey,
        event: &HubEvent,
        sender: &ConnectionId,
    ) -> Result<usize, MessagePushError>;

    /// Deliver to every open connection.
    async fn emit_all(&self, event: &HubEvent) -> Result<usize, MessagePushError>;

    /// Deliver to one connection.
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &HubEvent,
    ) -> Result<(), MessagePushError>;
}

/// Membership side of the hub.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// Register a connection, optionally already authenticated.
    async fn register(
        &self,
        connection_id: ConnectionId,
        user_id: Option<UserId>,
        sender: PusherChannel,
    );

    /// Drop the connection and every room membership it held.
    async fn unregister(&self, connection_id: &ConnectionId);

    /// Tie an authenticated user to the connection.
    async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
    ) -> Result<(), MessagePushError>;

    /// Authenticated user of the connection, if any.
    async fn user_of(&self, connection_id: &ConnectionId) -> Option<UserId>;

    /// Idempotent. Returns `true` when the membership is new.
    async fn join(
        &self,
        connection_id: &ConnectionId,
        room: RoomKey,
    ) -> Result<bool, MessagePushError>;

    /// Idempotent. Returns `true` when a membership was removed.
    async fn leave(&self, connection_id: &ConnectionId, room: &RoomKey) -> bool;

    async fn is_member(&self, connection_id: &ConnectionId, room: &RoomKey) -> bool;

    async fn member_count(&self, room: &RoomKey) -> usize;

    async fn connection_count(&self) -> usize;
}
