//! UseCase: 配信・既読ステータスの更新
//!
//! Status only moves forward (`sent → delivered → read`). A repeated or
//! late acknowledgement is a no-op and emits nothing.
//!
//! ## テスト実装の作業記録
//!
//! ### どのような状況を想定しているか
//! - 正常系：delivered / read への前進と `chat:update` の配信
//! - エッジケース：既読メッセージへの delivered は no-op（read を維持）
//! - 正常系：スレッド全体の既読化と `chat:updateBulk`
//! - 正常系：ファイル添付後の `chat:update`（fileUrl 付き）

use std::sync::Arc;

use porchlight_shared::time::Clock;

use crate::domain::{
    Attachment, BookingId, BookingRepository, ChatMessage, ChatMessageRepository, HubEvent,
    MessageId, MessagePusher, MessageStatus, RepositoryError, RoomKey, StatusChange, Timestamp,
    UserId,
};

use super::error::ChatError;

/// メッセージステータス更新のユースケース
pub struct MessageStatusUseCase {
    bookings: Arc<dyn BookingRepository>,
    messages: Arc<dyn ChatMessageRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl MessageStatusUseCase {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        messages: Arc<dyn ChatMessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            messages,
            message_pusher,
            clock,
        }
    }

    /// `chat:delivered`
    pub async fn mark_delivered(
        &self,
        actor: Option<&UserId>,
        message_id: &MessageId,
    ) -> Result<StatusChange, ChatError> {
        self.advance(actor, message_id, MessageStatus::Delivered).await
    }

    /// `chat:readOne`. The room is taken from the stored message.
    pub async fn mark_read(
        &self,
        actor: Option<&UserId>,
        message_id: &MessageId,
    ) -> Result<StatusChange, ChatError> {
        self.advance(actor, message_id, MessageStatus::Read).await
    }

    /// `chat:read`: unread messages of the booking become read.
    ///
    /// A known actor only reads what was addressed to them; an anonymous
    /// connection marks the whole thread. Returns how many messages changed.
    /// `chat:updateBulk` goes out only when at least one did.
    pub async fn mark_all_read(
        &self,
        actor: Option<&UserId>,
        booking_id: &BookingId,
    ) -> Result<usize, ChatError> {
        let changed = match actor {
            Some(actor) => {
                let booking = self
                    .bookings
                    .find(booking_id)
                    .await?
                    .ok_or_else(|| ChatError::BookingNotFound(booking_id.to_string()))?;
                if !booking.is_party(actor) {
                    return Err(ChatError::NotParticipant(actor.to_string()));
                }
                self.messages
                    .mark_received_read(booking_id, actor, self.now())
                    .await?
            }
            None => self.messages.mark_all_read(booking_id, self.now()).await?,
        };
        if changed > 0 {
            self.broadcast(
                booking_id,
                HubEvent::ChatUpdateBulk {
                    booking_id: booking_id.clone(),
                    status: MessageStatus::Read,
                    reader_id: actor.cloned(),
                },
            )
            .await;
        }
        tracing::debug!(booking_id = %booking_id, changed, "Marked thread read");
        Ok(changed)
    }

    /// `chat:fileUploaded`: attach an uploaded file to an existing message.
    ///
    /// The status is left as it is.
    pub async fn attach_file(
        &self,
        actor: Option<&UserId>,
        booking_id: &BookingId,
        message_id: &MessageId,
        file_url: String,
    ) -> Result<ChatMessage, ChatError> {
        let message = self.load(message_id).await?;
        if &message.booking_id != booking_id {
            return Err(ChatError::MessageNotFound(message_id.to_string()));
        }
        if let Some(actor) = actor
            && actor != &message.sender_id
        {
            return Err(ChatError::NotParticipant(actor.to_string()));
        }

        let file_type = message.attachment.as_ref().and_then(|a| a.file_type);
        let attachment = Attachment::new(file_url, file_type)?;
        let updated = self
            .messages
            .attach_file(message_id, attachment)
            .await
            .map_err(|e| not_found_as_message(e, message_id))?;

        self.broadcast(
            booking_id,
            HubEvent::ChatUpdate {
                message_id: updated.id.clone(),
                status: updated.status,
                file_url: updated.attachment.as_ref().map(|a| a.url.clone()),
            },
        )
        .await;
        Ok(updated)
    }

    async fn advance(
        &self,
        actor: Option<&UserId>,
        message_id: &MessageId,
        target: MessageStatus,
    ) -> Result<StatusChange, ChatError> {
        if let Some(actor) = actor {
            let message = self.load(message_id).await?;
            if actor != &message.sender_id && actor != &message.receiver_id {
                return Err(ChatError::NotParticipant(actor.to_string()));
            }
        }

        let change = self
            .messages
            .advance_status(message_id, target, self.now())
            .await
            .map_err(|e| not_found_as_message(e, message_id))?;

        match &change {
            StatusChange::Advanced(message) => {
                self.broadcast(
                    &message.booking_id,
                    HubEvent::ChatUpdate {
                        message_id: message.id.clone(),
                        status: message.status,
                        file_url: None,
                    },
                )
                .await;
            }
            StatusChange::Unchanged(message) => {
                tracing::debug!(
                    message_id = %message.id,
                    current = message.status.as_str(),
                    target = target.as_str(),
                    "Status already at or past target, nothing to do"
                );
            }
        }
        Ok(change)
    }

    async fn load(&self, message_id: &MessageId) -> Result<ChatMessage, ChatError> {
        self.messages
            .find(message_id)
            .await?
            .ok_or_else(|| ChatError::MessageNotFound(message_id.to_string()))
    }

    async fn broadcast(&self, booking_id: &BookingId, event: HubEvent) {
        if let Err(e) = self
            .message_pusher
            .emit(&RoomKey::chat(booking_id), &event)
            .await
        {
            tracing::warn!(booking_id = %booking_id, event = event.name(), "Failed to broadcast status update: {}", e);
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

fn not_found_as_message(err: RepositoryError, message_id: &MessageId) -> ChatError {
    match err {
        RepositoryError::NotFound { .. } => ChatError::MessageNotFound(message_id.to_string()),
        other => ChatError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingStatus, MessageContent, MockMessagePusher};
    use crate::infrastructure::repository::{
        InMemoryBookingRepository, InMemoryChatMessageRepository,
    };
    use crate::usecase::test_support::{booking_id, seed_booking, user};
    use porchlight_shared::time::FixedClock;

    struct Fixture {
        messages: Arc<InMemoryChatMessageRepository>,
        bookings: Arc<InMemoryBookingRepository>,
    }

    async fn fixture() -> Fixture {
        let bookings = Arc::new(InMemoryBookingRepository::new());
        seed_booking(&*bookings, "b1", "client", "worker", BookingStatus::Accepted).await;
        Fixture {
            messages: Arc::new(InMemoryChatMessageRepository::new()),
            bookings,
        }
    }

    impl Fixture {
        fn usecase(&self, pusher: MockMessagePusher) -> MessageStatusUseCase {
            MessageStatusUseCase::new(
                self.bookings.clone(),
                self.messages.clone(),
                Arc::new(pusher),
                Arc::new(FixedClock::new(9_000)),
            )
        }

        async fn seed_message(&self, body: &str) -> ChatMessage {
            let message = ChatMessage::new(
                booking_id("b1"),
                user("client"),
                user("worker"),
                MessageContent::new(Some(body.to_string()), None).unwrap(),
                None,
                Timestamp::new(1_000),
            );
            self.messages.insert(message).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_mark_delivered_advances_and_broadcasts() {
        // テスト項目: sent のメッセージは delivered になり chat:update が配信される
        // given (前提条件):
        let f = fixture().await;
        let message = f.seed_message("hi").await;
        let mut pusher = MockMessagePusher::new();
        let expected_id = message.id.clone();
        pusher
            .expect_emit()
            .withf(move |room, event| {
                room == &RoomKey::chat(&booking_id("b1"))
                    && *event
                        == HubEvent::ChatUpdate {
                            message_id: expected_id.clone(),
                            status: MessageStatus::Delivered,
                            file_url: None,
                        }
            })
            .times(1)
            .returning(|_, _| Ok(2));
        let usecase = f.usecase(pusher);

        // when (操作):
        let change = usecase
            .mark_delivered(Some(&user("worker")), &message.id)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(change.is_advanced());
        assert_eq!(change.message().status, MessageStatus::Delivered);
    }

    #[tokio::test]
    async fn test_mark_delivered_after_read_is_noop() {
        // テスト項目: 既読メッセージへの delivered は no-op で read を維持し、配信もしない
        // given (前提条件):
        let f = fixture().await;
        let message = f.seed_message("hi").await;
        f.messages
            .advance_status(&message.id, MessageStatus::Read, Timestamp::new(2_000))
            .await
            .unwrap();
        let mut pusher = MockMessagePusher::new();
        pusher.expect_emit().never();
        let usecase = f.usecase(pusher);

        // when (操作):
        let change = usecase.mark_delivered(None, &message.id).await.unwrap();

        // then (期待する結果):
        assert!(!change.is_advanced());
        assert_eq!(change.message().status, MessageStatus::Read);
        assert_eq!(change.message().read_at, Some(Timestamp::new(2_000)));
    }

    #[tokio::test]
    async fn test_mark_read_sets_read_at() {
        // given (前提条件):
        let f = fixture().await;
        let message = f.seed_message("hi").await;
        let mut pusher = MockMessagePusher::new();
        pusher.expect_emit().times(1).returning(|_, _| Ok(1));
        let usecase = f.usecase(pusher);

        // when (操作):
        let change = usecase.mark_read(None, &message.id).await.unwrap();

        // then (期待する結果):
        assert_eq!(change.message().status, MessageStatus::Read);
        assert_eq!(change.message().read_at, Some(Timestamp::new(9_000)));
    }

    #[tokio::test]
    async fn test_unknown_message_is_not_found() {
        // given (前提条件):
        let f = fixture().await;
        let usecase = f.usecase(MockMessagePusher::new());

        // when (操作):
        let result = usecase.mark_delivered(None, &MessageId::generate()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::MessageNotFound(_))));
    }

    #[tokio::test]
    async fn test_stranger_cannot_acknowledge() {
        // given (前提条件):
        let f = fixture().await;
        let message = f.seed_message("hi").await;
        let usecase = f.usecase(MockMessagePusher::new());

        // when (操作):
        let result = usecase
            .mark_read(Some(&user("mallory")), &message.id)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::NotParticipant(_))));
    }

    #[tokio::test]
    async fn test_mark_all_read_emits_bulk_update_once() {
        // テスト項目: スレッド全体の既読化で chat:updateBulk が 1 回だけ配信される
        // given (前提条件):
        let f = fixture().await;
        f.seed_message("one").await;
        f.seed_message("two").await;
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_emit()
            .withf(|_, event| {
                *event
                    == HubEvent::ChatUpdateBulk {
                        booking_id: booking_id("b1"),
                        status: MessageStatus::Read,
                        reader_id: Some(user("worker")),
                    }
            })
            .times(1)
            .returning(|_, _| Ok(1));
        let usecase = f.usecase(pusher);

        // when (操作):
        let first = usecase
            .mark_all_read(Some(&user("worker")), &booking_id("b1"))
            .await
            .unwrap();
        let second = usecase
            .mark_all_read(Some(&user("worker")), &booking_id("b1"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(first, 2);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_mark_all_read_leaves_actors_own_messages() {
        // テスト項目: chat:read は送信者自身のメッセージを既読にしない
        // given (前提条件):
        let f = fixture().await;
        let from_client = f.seed_message("from client").await;
        let mut pusher = MockMessagePusher::new();
        pusher.expect_emit().times(0);
        let usecase = f.usecase(pusher);

        // when (操作):
        let changed = usecase
            .mark_all_read(Some(&user("client")), &booking_id("b1"))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(changed, 0);
        let stored = f.messages.find(&from_client.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert_eq!(stored.read_at, None);
    }

    #[tokio::test]
    async fn test_mark_all_read_without_actor_marks_whole_thread() {
        // given (前提条件):
        let f = fixture().await;
        f.seed_message("from client").await;
        let mut pusher = MockMessagePusher::new();
        pusher.expect_emit().times(1).returning(|_, _| Ok(0));
        let usecase = f.usecase(pusher);

        // when (操作):
        let changed = usecase.mark_all_read(None, &booking_id("b1")).await.unwrap();

        // then (期待する結果):
        assert_eq!(changed, 1);
    }

    #[tokio::test]
    async fn test_attach_file_rebroadcasts_with_file_url() {
        // テスト項目: ファイル添付後、fileUrl 付きの chat:update が配信されステータスは変わらない
        // given (前提条件):
        let f = fixture().await;
        let message = f.seed_message("see photo").await;
        f.messages
            .advance_status(&message.id, MessageStatus::Delivered, Timestamp::new(2_000))
            .await
            .unwrap();
        let mut pusher = MockMessagePusher::new();
        pusher
            .expect_emit()
            .withf(|_, event| {
                matches!(
                    event,
                    HubEvent::ChatUpdate {
                        status: MessageStatus::Delivered,
                        file_url: Some(url),
                        ..
                    } if url == "https://cdn.example/p.png"
                )
            })
            .times(1)
            .returning(|_, _| Ok(1));
        let usecase = f.usecase(pusher);

        // when (操作):
        let updated = usecase
            .attach_file(
                Some(&user("client")),
                &booking_id("b1"),
                &message.id,
                "https://cdn.example/p.png".to_string(),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(updated.status, MessageStatus::Delivered);
        assert_eq!(
            updated.attachment.map(|a| a.url),
            Some("https://cdn.example/p.png".to_string())
        );
    }

    #[tokio::test]
    async fn test_attach_file_to_other_booking_is_not_found() {
        // given (前提条件):
        let f = fixture().await;
        let message = f.seed_message("hi").await;
        let usecase = f.usecase(MockMessagePusher::new());

        // when (操作):
        let result = usecase
            .attach_file(None, &booking_id("b2"), &message.id, "https://x/y".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::MessageNotFound(_))));
    }
}
