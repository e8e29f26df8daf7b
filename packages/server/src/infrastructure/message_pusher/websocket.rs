//! WebSocket を使った Connection Hub 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` と認証済みユーザーの管理
//! - ルーム（`chat:<bookingId>` / `live:<sessionId>` / `notifications:<userId>`）の購読表
//! - ルーム単位・全体・単一接続へのイベント送信
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成された sender を受け取り、エンコード済みフレームの送信だけを担当します。
//!
//! 接続表とルーム表は 1 つの `Mutex` の内側にあり、常に互いに整合します。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, HubEvent, MessagePushError, MessagePusher, PusherChannel, RoomKey,
    RoomRegistry, UserId,
};
use crate::infrastructure::dto::conversion::encode_event;

struct ConnectionEntry {
    sender: PusherChannel,
    user_id: Option<UserId>,
    rooms: HashSet<RoomKey>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<RoomKey, HashSet<ConnectionId>>,
}

impl HubState {
    /// Hand `frame` to each target. A closed channel is skipped, not fatal.
    fn deliver<'a>(&self, targets: impl Iterator<Item = &'a ConnectionId>, frame: &str) -> usize {
        let mut delivered = 0;
        for conn_id in targets {
            let Some(entry) = self.connections.get(conn_id) else {
                tracing::warn!(conn_id = %conn_id, "Connection vanished from room table, skipping");
                continue;
            };
            match entry.sender.send(frame.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(conn_id = %conn_id, "Failed to push frame: {}", e),
            }
        }
        delivered
    }
}

/// プロセス内の Connection Hub
///
/// 起動時に 1 度だけ生成され、`Arc` で各ユースケースに注入されます。
#[derive(Default)]
pub struct WebSocketHub {
    state: Mutex<HubState>,
}

impl WebSocketHub {
    pub fn new() -> Self {
        Self::default()
    }
}

fn encode(event: &HubEvent) -> Result<String, MessagePushError> {
    encode_event(event).map_err(|e| MessagePushError::Encode(e.to_string()))
}

#[async_trait]
impl MessagePusher for WebSocketHub {
    async fn emit(&self, room: &RoomKey, event: &HubEvent) -> Result<usize, MessagePushError> {
        let frame = encode(event)?;
        let state = self.state.lock().await;
        let delivered = match state.rooms.get(room) {
            Some(members) => state.deliver(members.iter(), &frame),
            None => 0,
        };
        tracing::debug!(room = %room, event = event.name(), delivered, "Emitted event");
        Ok(delivered)
    }

    async fn emit_except(
        &self,
        room: &RoomKey,
        event: &HubEvent,
        sender: &ConnectionId,
    ) -> Result<usize, MessagePushError> {
        let frame = encode(event)?;
        let state = self.state.lock().await;
        let delivered = match state.rooms.get(room) {
            Some(members) => state.deliver(members.iter().filter(|id| *id != sender), &frame),
            None => 0,
        };
        tracing::debug!(room = %room, event = event.name(), delivered, "Emitted event to peers");
        Ok(delivered)
    }

    async fn emit_all(&self, event: &HubEvent) -> Result<usize, MessagePushError> {
        let frame = encode(event)?;
        let state = self.state.lock().await;
        let delivered = state.deliver(state.connections.keys(), &frame);
        tracing::debug!(event = event.name(), delivered, "Emitted event to all connections");
        Ok(delivered)
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &HubEvent,
    ) -> Result<(), MessagePushError> {
        let frame = encode(event)?;
        let state = self.state.lock().await;
        let entry = state
            .connections
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection_id.to_string()))?;
        entry
            .sender
            .send(frame)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }
}

#[async_trait]
impl RoomRegistry for WebSocketHub {
    async fn register(
        &self,
        connection_id: ConnectionId,
        user_id: Option<UserId>,
        sender: PusherChannel,
    ) {
        let mut state = self.state.lock().await;
        tracing::debug!(conn_id = %connection_id, user_id = ?user_id.as_ref().map(|u| u.as_str()), "Connection registered");
        state.connections.insert(
            connection_id,
            ConnectionEntry {
                sender,
                user_id,
                rooms: HashSet::new(),
            },
        );
    }

    async fn unregister(&self, connection_id: &ConnectionId) {
        let mut state = self.state.lock().await;
        let Some(entry) = state.connections.remove(connection_id) else {
            return;
        };
        for room in &entry.rooms {
            if let Some(members) = state.rooms.get_mut(room) {
                members.remove(connection_id);
                if members.is_empty() {
                    state.rooms.remove(room);
                }
            }
        }
        tracing::debug!(conn_id = %connection_id, rooms = entry.rooms.len(), "Connection unregistered");
    }

    async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
    ) -> Result<(), MessagePushError> {
        let mut state = self.state.lock().await;
        let entry = state
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection_id.to_string()))?;
        tracing::debug!(conn_id = %connection_id, user_id = %user_id, "Connection authenticated");
        entry.user_id = Some(user_id);
        Ok(())
    }

    async fn user_of(&self, connection_id: &ConnectionId) -> Option<UserId> {
        let state = self.state.lock().await;
        state
            .connections
            .get(connection_id)
            .and_then(|entry| entry.user_id.clone())
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        room: RoomKey,
    ) -> Result<bool, MessagePushError> {
        let mut state = self.state.lock().await;
        let entry = state
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection_id.to_string()))?;
        if !entry.rooms.insert(room.clone()) {
            return Ok(false);
        }
        tracing::debug!(conn_id = %connection_id, room = %room, "Joined room");
        state
            .rooms
            .entry(room)
            .or_default()
            .insert(connection_id.clone());
        Ok(true)
    }

    async fn leave(&self, connection_id: &ConnectionId, room: &RoomKey) -> bool {
        let mut state = self.state.lock().await;
        let removed = state
            .connections
            .get_mut(connection_id)
            .is_some_and(|entry| entry.rooms.remove(room));
        if !removed {
            return false;
        }
        if let Some(members) = state.rooms.get_mut(room) {
            members.remove(connection_id);
            if members.is_empty() {
                state.rooms.remove(room);
            }
        }
        tracing::debug!(conn_id = %connection_id, room = %room, "Left room");
        true
    }

    async fn is_member(&self, connection_id: &ConnectionId, room: &RoomKey) -> bool {
        let state = self.state.lock().await;
        state
            .rooms
            .get(room)
            .is_some_and(|members| members.contains(connection_id))
    }

    async fn member_count(&self, room: &RoomKey) -> usize {
        let state = self.state.lock().await;
        state.rooms.get(room).map_or(0, HashSet::len)
    }

    async fn connection_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingId, Coordinates, SessionId};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 接続の登録・解除とルーム購読表の整合性
    // - emit / emit_except / emit_all / push_to の配送先
    // - join / leave の冪等性
    //
    // 【どのようなシナリオをテストするか】
    // 1. ルームのメンバー全員に 1 回ずつ届く
    // 2. 別ルームのメンバーには届かない（ルーム分離）
    // 3. 空ルームへの emit はエラーにならない
    // 4. 切断時に全ルームから外れる
    // ========================================

    fn booking(raw: &str) -> BookingId {
        BookingId::new(raw.to_string()).unwrap()
    }

    async fn connect(hub: &WebSocketHub) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::generate();
        hub.register(id.clone(), None, tx).await;
        (id, rx)
    }

    fn live_update() -> HubEvent {
        HubEvent::LiveUpdate {
            coords: Coordinates { lat: 28.6, lng: 77.2 },
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_member_once() {
        // テスト項目: ルームのメンバー全員に 1 回ずつ届く
        // given (前提条件):
        let hub = WebSocketHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;
        let room = RoomKey::chat(&booking("b1"));
        hub.join(&a, room.clone()).await.unwrap();
        hub.join(&b, room.clone()).await.unwrap();

        // when (操作):
        let delivered = hub.emit(&room, &live_update()).await.unwrap();

        // then (期待する結果):
        assert_eq!(delivered, 2);
        assert!(rx_a.recv().await.unwrap().contains("live:update"));
        assert!(rx_b.recv().await.unwrap().contains("live:update"));
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_is_isolated_per_room() {
        // テスト項目: chat:A への配信は chat:B のみの購読者に届かない
        // given (前提条件):
        let hub = WebSocketHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;
        hub.join(&a, RoomKey::chat(&booking("A"))).await.unwrap();
        hub.join(&b, RoomKey::chat(&booking("B"))).await.unwrap();

        // when (操作):
        hub.emit(&RoomKey::chat(&booking("A")), &live_update())
            .await
            .unwrap();

        // then (期待する結果):
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_to_empty_room_is_silent() {
        // テスト項目: メンバーのいないルームへの emit は 0 件で成功する
        // given (前提条件):
        let hub = WebSocketHub::new();

        // when (操作):
        let result = hub
            .emit(&RoomKey::live(&SessionId::generate()), &live_update())
            .await;

        // then (期待する結果):
        assert_eq!(result, Ok(0));
    }

    #[tokio::test]
    async fn test_join_and_leave_are_idempotent() {
        // テスト項目: 二重 join / 未参加ルームの leave は no-op
        // given (前提条件):
        let hub = WebSocketHub::new();
        let (a, _rx) = connect(&hub).await;
        let room = RoomKey::chat(&booking("b1"));

        // when (操作):
        let first = hub.join(&a, room.clone()).await.unwrap();
        let second = hub.join(&a, room.clone()).await.unwrap();
        let left = hub.leave(&a, &room).await;
        let left_again = hub.leave(&a, &room).await;

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert!(left);
        assert!(!left_again);
        assert_eq!(hub.member_count(&room).await, 0);
    }

    #[tokio::test]
    async fn test_join_unknown_connection_fails() {
        // given (前提条件):
        let hub = WebSocketHub::new();

        // when (操作):
        let result = hub
            .join(&ConnectionId::generate(), RoomKey::chat(&booking("b1")))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::ConnectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_unregister_drops_every_membership() {
        // テスト項目: 切断時に保持していた全ルームから外れる
        // given (前提条件):
        let hub = WebSocketHub::new();
        let (a, _rx) = connect(&hub).await;
        let chat = RoomKey::chat(&booking("b1"));
        let live = RoomKey::live(&SessionId::generate());
        hub.join(&a, chat.clone()).await.unwrap();
        hub.join(&a, live.clone()).await.unwrap();

        // when (操作):
        hub.unregister(&a).await;

        // then (期待する結果):
        assert_eq!(hub.member_count(&chat).await, 0);
        assert_eq!(hub.member_count(&live).await, 0);
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_emit_except_skips_sender() {
        // given (前提条件):
        let hub = WebSocketHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;
        let room = RoomKey::chat(&booking("b1"));
        hub.join(&a, room.clone()).await.unwrap();
        hub.join(&b, room.clone()).await.unwrap();

        // when (操作):
        let delivered = hub.emit_except(&room, &live_update(), &a).await.unwrap();

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_emit_all_reaches_unjoined_connections() {
        // given (前提条件):
        let hub = WebSocketHub::new();
        let (_a, mut rx_a) = connect(&hub).await;
        let (_b, mut rx_b) = connect(&hub).await;

        // when (操作):
        let delivered = hub
            .emit_all(&HubEvent::AdminStatsUpdated(serde_json::json!({ "bookings": 3 })))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(delivered, 2);
        assert!(rx_a.recv().await.unwrap().contains("admin:statsUpdated"));
        assert!(rx_b.recv().await.unwrap().contains("admin:statsUpdated"));
    }

    #[tokio::test]
    async fn test_closed_receiver_is_skipped() {
        // テスト項目: 受信側が閉じた接続への送信は失敗扱いでスキップされる
        // given (前提条件):
        let hub = WebSocketHub::new();
        let (a, rx_a) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;
        let room = RoomKey::chat(&booking("b1"));
        hub.join(&a, room.clone()).await.unwrap();
        hub.join(&b, room.clone()).await.unwrap();
        drop(rx_a);

        // when (操作):
        let delivered = hub.emit(&room, &live_update()).await.unwrap();

        // then (期待する結果):
        assert_eq!(delivered, 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_push_to_and_authenticate() {
        // given (前提条件):
        let hub = WebSocketHub::new();
        let (a, mut rx_a) = connect(&hub).await;
        let user = UserId::new("u1".to_string()).unwrap();

        // when (操作):
        hub.authenticate(&a, user.clone()).await.unwrap();
        hub.push_to(
            &a,
            &HubEvent::Rejected {
                event: "joinChat".to_string(),
                reason: "nope".to_string(),
            },
        )
        .await
        .unwrap();

        // then (期待する結果):
        assert_eq!(hub.user_of(&a).await, Some(user));
        assert!(rx_a.recv().await.unwrap().contains("\"event\":\"error\""));
        assert!(matches!(
            hub.push_to(&ConnectionId::generate(), &live_update()).await,
            Err(MessagePushError::ConnectionNotFound(_))
        ));
    }
}
