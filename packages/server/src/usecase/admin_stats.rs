//! UseCase: 管理ダッシュボードへの統計更新通知

use std::sync::Arc;

use porchlight_shared::time::{Clock, timestamp_to_rfc3339};

use crate::domain::{HubEvent, MessagePushError, MessagePusher};

/// 統計更新通知のユースケース
pub struct AdminStatsUseCase {
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl AdminStatsUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            message_pusher,
            clock,
        }
    }

    /// `emitAll("admin:statsUpdated", payload)`. Without a payload the event
    /// carries only `updatedAt`.
    pub async fn refresh(
        &self,
        payload: Option<serde_json::Value>,
    ) -> Result<usize, MessagePushError> {
        let payload = payload.unwrap_or_else(|| {
            serde_json::json!({ "updatedAt": timestamp_to_rfc3339(self.clock.now_millis()) })
        });
        let delivered = self
            .message_pusher
            .emit_all(&HubEvent::AdminStatsUpdated(payload))
            .await?;
        tracing::info!(delivered, "Admin stats refresh broadcast");
        Ok(delivered)
    }
}
