//! UseCase: 接続のライフサイクル
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 接続登録、後からの認証、切断時の全ルーム離脱
//!
//! ### どのような状況を想定しているか
//! - 正常系：トークン付き接続 / トークンなし接続の後の `auth`
//! - エッジケース：登録されていない接続への認証

use std::sync::Arc;

use crate::domain::{ConnectionId, PusherChannel, RoomRegistry, UserId};

use super::error::RoomAccessError;

/// 接続のユースケース
pub struct ConnectionUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl ConnectionUseCase {
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// 接続を登録する。認証は任意（handshake でトークンが来た場合のみ `user_id` が入る）
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        user_id: Option<UserId>,
        sender: PusherChannel,
    ) {
        tracing::info!(
            conn_id = %connection_id,
            authenticated = user_id.is_some(),
            "Connection opened"
        );
        self.registry.register(connection_id, user_id, sender).await;
    }

    /// 接続にユーザーを紐付ける（`auth` イベント）
    pub async fn authenticate(
        &self,
        connection_id: &ConnectionId,
        user_id: UserId,
    ) -> Result<(), RoomAccessError> {
        self.registry.authenticate(connection_id, user_id).await?;
        Ok(())
    }

    /// 切断。保持していた全ルームから外れる。「オフライン」通知は送らない
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        self.registry.unregister(connection_id).await;
        tracing::info!(conn_id = %connection_id, "Connection closed");
    }
}
