//! UseCase: 通知のファンアウト
//!
//! Every call persists a notification. The live `notification:new` push to
//! `notifications:<recipientId>` goes through the [`DedupGuard`], so a burst
//! of identical triggers produces one push but one record per trigger.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 永続化は常に行われ、重複抑制はライブ配信だけに効くこと
//! - 配信の失敗が永続化を巻き戻さないこと
//! - 既読化は受信者本人のものだけ
//!
//! ### どのような状況を想定しているか
//! - 正常系：通知の保存と配信
//! - エッジケース：500ms 以内の二重通知、ウィンドウ経過後の再通知
//! - 異常系：ストア障害、配信失敗、他人の通知の既読化

use std::sync::Arc;

use porchlight_shared::time::Clock;

use crate::domain::{
    DedupGuard, DedupKey, HubEvent, MessagePusher, Notification, NotificationId,
    NotificationRepository, NotificationType, RepositoryError, RoomKey, Timestamp, UserId,
    ValidationError,
};

use super::error::NotifyError;

/// How many notifications the list endpoint returns.
pub const NOTIFICATION_LIST_LIMIT: usize = 50;

/// 通知内容
#[derive(Debug, Clone)]
pub struct NotifyCommand {
    pub recipient_id: UserId,
    pub actor_id: Option<UserId>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    /// Deep-link payload; should carry `bookingId` where one applies.
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct NotifyOutcome {
    pub notification: Notification,
    /// Whether the live push went out (false when suppressed or failed).
    pub pushed: bool,
}

/// 通知ファンアウトのユースケース
pub struct NotifyUseCase {
    notifications: Arc<dyn NotificationRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    dedup: DedupGuard,
    clock: Arc<dyn Clock>,
}

impl NotifyUseCase {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        dedup: DedupGuard,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notifications,
            message_pusher,
            dedup,
            clock,
        }
    }

    /// `notify`
    pub async fn execute(&self, command: NotifyCommand) -> Result<NotifyOutcome, NotifyError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::Empty("title").into());
        }

        // 1. 無条件に永続化
        let notification = Notification {
            id: NotificationId::generate(),
            recipient_id: command.recipient_id,
            actor_id: command.actor_id,
            kind: command.kind,
            title,
            message: command.message,
            data: command.data,
            read: false,
            created_at: Timestamp::new(self.clock.now_millis()),
        };
        let notification = self.notifications.insert(notification).await?;

        // 2. 重複チェック
        let key = DedupKey::for_notification(&notification);
        if !self.dedup.try_acquire(&key).await {
            tracing::debug!(dedup_key = %key, "Duplicate notification push suppressed");
            return Ok(NotifyOutcome {
                notification,
                pushed: false,
            });
        }

        // 3. ライブ配信（失敗しても保存済みの通知は残る）
        let room = RoomKey::notifications(&notification.recipient_id);
        let pushed = match self
            .message_pusher
            .emit(&room, &HubEvent::NotificationNew(notification.clone()))
            .await
        {
            Ok(delivered) => {
                tracing::debug!(room = %room, delivered, kind = notification.kind.as_str(), "Notification pushed");
                true
            }
            Err(e) => {
                tracing::warn!(room = %room, "Failed to push notification: {}", e);
                false
            }
        };

        Ok(NotifyOutcome {
            notification,
            pushed,
        })
    }

    /// Unread first, then newest first.
    pub async fn list(&self, recipient_id: &UserId) -> Result<Vec<Notification>, NotifyError> {
        Ok(self
            .notifications
            .list_for_recipient(recipient_id, NOTIFICATION_LIST_LIMIT)
            .await?)
    }

    /// `markAsRead`. Someone else's notification is reported as not found.
    pub async fn mark_read(
        &self,
        id: &NotificationId,
        recipient_id: &UserId,
    ) -> Result<Notification, NotifyError> {
        self.notifications
            .mark_read(id, recipient_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound { .. } => NotifyError::NotFound(id.to_string()),
                other => NotifyError::Store(other),
            })
    }

    /// `markAllRead`
    pub async fn mark_all_read(&self, recipient_id: &UserId) -> Result<usize, NotifyError> {
        Ok(self.notifications.mark_all_read(recipient_id).await?)
    }
}
