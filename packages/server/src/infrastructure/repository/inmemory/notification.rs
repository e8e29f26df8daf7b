use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Notification, NotificationId, NotificationRepository, RepositoryError, UserId};

/// インメモリ Notification Repository 実装
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        self.notifications.lock().await.push(notification.clone());
        Ok(notification)
    }

    async fn list_for_recipient(
        &self,
        recipient_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.lock().await;
        let mut listed: Vec<Notification> = notifications
            .iter()
            .filter(|n| &n.recipient_id == recipient_id)
            .cloned()
            .collect();
        // unread first, newest first; later inserts win ties
        listed.reverse();
        listed.sort_by(|a, b| {
            a.read
                .cmp(&b.read)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        listed.truncate(limit);
        Ok(listed)
    }

    async fn mark_read(
        &self,
        id: &NotificationId,
        recipient_id: &UserId,
    ) -> Result<Notification, RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let notification = notifications
            .iter_mut()
            .find(|n| &n.id == id && &n.recipient_id == recipient_id)
            .ok_or_else(|| RepositoryError::not_found("notification", id.as_str()))?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, recipient_id: &UserId) -> Result<usize, RepositoryError> {
        let mut notifications = self.notifications.lock().await;
        let mut changed = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| &n.recipient_id == recipient_id && !n.read)
        {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn count_for_recipient(&self, recipient_id: &UserId) -> Result<usize, RepositoryError> {
        let notifications = self.notifications.lock().await;
        Ok(notifications
            .iter()
            .filter(|n| &n.recipient_id == recipient_id)
            .count())
    }
}
