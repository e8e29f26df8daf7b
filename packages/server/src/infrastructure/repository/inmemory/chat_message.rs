use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Attachment, BookingId, ChatMessage, ChatMessageRepository, MessageId, MessageStatus,
    RepositoryError, StatusChange, Timestamp, UserId,
};

/// インメモリ ChatMessage Repository 実装
///
/// Messages are kept in insertion order, which is also persistence order.
#[derive(Default)]
pub struct InMemoryChatMessageRepository {
    messages: Mutex<Vec<ChatMessage>>,
}

impl InMemoryChatMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mark_read_where(
        &self,
        at: Timestamp,
        predicate: impl Fn(&ChatMessage) -> bool,
    ) -> usize {
        let mut messages = self.messages.lock().await;
        messages
            .iter_mut()
            .filter(|m| predicate(m))
            .map(|m| m.advance(MessageStatus::Read, at))
            .filter(|advanced| *advanced)
            .count()
    }
}

fn not_found(id: &MessageId) -> RepositoryError {
    RepositoryError::not_found("message", id.as_str())
}

#[async_trait]
impl ChatMessageRepository for InMemoryChatMessageRepository {
    async fn insert(&self, message: ChatMessage) -> Result<ChatMessage, RepositoryError> {
        let mut messages = self.messages.lock().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(RepositoryError::Conflict(format!(
                "message '{}' already exists",
                message.id
            )));
        }
        messages.push(message.clone());
        Ok(message)
    }

    async fn find(&self, id: &MessageId) -> Result<Option<ChatMessage>, RepositoryError> {
        let messages = self.messages.lock().await;
        Ok(messages.iter().find(|m| &m.id == id).cloned())
    }

    async fn list_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let messages = self.messages.lock().await;
        Ok(messages
            .iter()
            .filter(|m| &m.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn advance_status(
        &self,
        id: &MessageId,
        target: MessageStatus,
        at: Timestamp,
    ) -> Result<StatusChange, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| not_found(id))?;

        if message.advance(target, at) {
            Ok(StatusChange::Advanced(message.clone()))
        } else {
            Ok(StatusChange::Unchanged(message.clone()))
        }
    }

    async fn mark_all_read(
        &self,
        booking_id: &BookingId,
        at: Timestamp,
    ) -> Result<usize, RepositoryError> {
        Ok(self.mark_read_where(at, |m| &m.booking_id == booking_id).await)
    }

    async fn mark_received_read(
        &self,
        booking_id: &BookingId,
        receiver_id: &UserId,
        at: Timestamp,
    ) -> Result<usize, RepositoryError> {
        Ok(self
            .mark_read_where(at, |m| {
                &m.booking_id == booking_id && &m.receiver_id == receiver_id
            })
            .await)
    }

    async fn attach_file(
        &self,
        id: &MessageId,
        attachment: Attachment,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut messages = self.messages.lock().await;
        let message = messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| not_found(id))?;
        message.attachment = Some(attachment);
        Ok(message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageContent, UserId};

    fn message(booking: &str, text: &str) -> ChatMessage {
        ChatMessage::new(
            BookingId::new(booking.to_string()).unwrap(),
            UserId::new("client".to_string()).unwrap(),
            UserId::new("worker".to_string()).unwrap(),
            MessageContent::new(Some(text.to_string()), None).unwrap(),
            None,
            Timestamp::new(1_000),
        )
    }

    #[tokio::test]
    async fn test_list_for_booking_keeps_persist_order() {
        // テスト項目: Booking ごとのメッセージが保存順に返される
        // given (前提条件):
        let repo = InMemoryChatMessageRepository::new();
        repo.insert(message("b1", "first")).await.unwrap();
        repo.insert(message("b2", "other")).await.unwrap();
        repo.insert(message("b1", "second")).await.unwrap();

        // when (操作):
        let listed = repo
            .list_for_booking(&BookingId::new("b1".to_string()).unwrap())
            .await
            .unwrap();

        // then (期待する結果):
        let texts: Vec<&str> = listed.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_advance_status_reports_unchanged_on_regression() {
        // テスト項目: read のメッセージを delivered にしようとしても変化しない
        // given (前提条件):
        let repo = InMemoryChatMessageRepository::new();
        let msg = repo.insert(message("b1", "hi")).await.unwrap();
        repo.advance_status(&msg.id, MessageStatus::Read, Timestamp::new(2_000))
            .await
            .unwrap();

        // when (操作):
        let change = repo
            .advance_status(&msg.id, MessageStatus::Delivered, Timestamp::new(3_000))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!change.is_advanced());
        assert_eq!(change.message().status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn test_advance_status_unknown_message() {
        // given (前提条件):
        let repo = InMemoryChatMessageRepository::new();

        // when (操作):
        let result = repo
            .advance_status(&MessageId::generate(), MessageStatus::Delivered, Timestamp::new(0))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_changed_messages() {
        // テスト項目: 未読のみが既読になり、変更件数が返される
        // given (前提条件):
        let repo = InMemoryChatMessageRepository::new();
        let a = repo.insert(message("b1", "a")).await.unwrap();
        repo.insert(message("b1", "b")).await.unwrap();
        repo.insert(message("b2", "c")).await.unwrap();
        repo.advance_status(&a.id, MessageStatus::Read, Timestamp::new(1))
            .await
            .unwrap();

        // when (操作):
        let changed = repo
            .mark_all_read(&BookingId::new("b1".to_string()).unwrap(), Timestamp::new(2))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(changed, 1);
    }

    #[tokio::test]
    async fn test_mark_received_read_skips_own_messages() {
        // テスト項目: 受信者を指定した一括既読は、その受信者宛てのメッセージだけを既読にする
        // given (前提条件):
        let repo = InMemoryChatMessageRepository::new();
        let to_worker = repo.insert(message("b1", "to worker")).await.unwrap();
        let mut reply = message("b1", "to client");
        std::mem::swap(&mut reply.sender_id, &mut reply.receiver_id);
        let to_client = repo.insert(reply).await.unwrap();

        // when (操作):
        let changed = repo
            .mark_received_read(
                &BookingId::new("b1".to_string()).unwrap(),
                &UserId::new("worker".to_string()).unwrap(),
                Timestamp::new(2),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(changed, 1);
        let read = repo.find(&to_worker.id).await.unwrap().unwrap();
        let untouched = repo.find(&to_client.id).await.unwrap().unwrap();
        assert_eq!(read.status, MessageStatus::Read);
        assert_eq!(untouched.status, MessageStatus::Sent);
    }
}
