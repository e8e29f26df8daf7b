//! UseCase: チャットメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 予約状態によるチャット可否、永続化、`chat:<bookingId>` への配信
//!
//! ### なぜこのテストが必要か
//! - 永続化前にポリシー違反を弾くこと（保留中の予約には何も保存されない）
//! - 永続化の失敗は送信者に返し、配信の失敗は握りつぶすこと
//! - 同一予約への同時送信が永続化順に配信されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：テキストのみ、受信者の自動決定、clientKey の引き継ぎ
//! - 異常系：保留中の予約、当事者以外の送信者、存在しない予約、ストア障害
//! - エッジケース：配信失敗（メッセージは保存済みのまま成功を返す）

use std::sync::Arc;

use porchlight_shared::time::Clock;

use crate::domain::{
    BookingId, BookingRepository, ChatMessage, ChatMessageRepository, ClientKey, HubEvent,
    MessageContent, MessagePusher, RoomKey, Timestamp, UserId,
};

use super::{booking_locks::BookingLocks, error::ChatError};

/// 送信内容
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub booking_id: BookingId,
    pub sender_id: UserId,
    /// Derived from the booking when omitted.
    pub receiver_id: Option<UserId>,
    pub content: MessageContent,
    pub client_key: Option<ClientKey>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    bookings: Arc<dyn BookingRepository>,
    messages: Arc<dyn ChatMessageRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    booking_locks: Arc<BookingLocks>,
}

impl SendMessageUseCase {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        messages: Arc<dyn ChatMessageRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        booking_locks: Arc<BookingLocks>,
    ) -> Self {
        Self {
            bookings,
            messages,
            message_pusher,
            clock,
            booking_locks,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - 永続化されたメッセージ（送信者が楽観的メッセージと照合する）
    /// * `Err(ChatError)` - 何も保存されていない
    pub async fn execute(&self, command: SendMessageCommand) -> Result<ChatMessage, ChatError> {
        // Held across insert and emit: delivery order equals persistence order.
        let booking_id = command.booking_id.clone();
        self.booking_locks
            .run(&booking_id, self.send_locked(command))
            .await
    }

    async fn send_locked(&self, command: SendMessageCommand) -> Result<ChatMessage, ChatError> {
        let SendMessageCommand {
            booking_id,
            sender_id,
            receiver_id,
            content,
            client_key,
        } = command;

        // 1. 予約の存在と状態を確認（ここで失敗すれば何も保存しない）
        let booking = self
            .bookings
            .find(&booking_id)
            .await?
            .ok_or_else(|| ChatError::BookingNotFound(booking_id.to_string()))?;

        let counterpart = booking
            .counterpart_of(&sender_id)
            .cloned()
            .ok_or_else(|| ChatError::NotParticipant(sender_id.to_string()))?;

        if !booking.status.permits_chat() {
            return Err(ChatError::ChatNotAllowed(booking.status.as_str()));
        }

        let receiver_id = match receiver_id {
            Some(receiver) if receiver != counterpart => {
                return Err(ChatError::InvalidReceiver(receiver.to_string()));
            }
            Some(receiver) => receiver,
            None => counterpart,
        };

        // 2. 永続化（失敗は送信者に返す）
        let message = ChatMessage::new(
            booking_id.clone(),
            sender_id,
            receiver_id,
            content,
            client_key,
            Timestamp::new(self.clock.now_millis()),
        );
        let message = self.messages.insert(message).await?;

        tracing::info!(
            booking_id = %booking_id,
            message_id = %message.id,
            sender_id = %message.sender_id,
            "Chat message persisted"
        );

        // 3. ルームへ配信（失敗しても保存済みのメッセージは残る）
        if let Err(e) = self
            .message_pusher
            .emit(&RoomKey::chat(&booking_id), &HubEvent::ChatNew(message.clone()))
            .await
        {
            tracing::warn!(booking_id = %booking_id, message_id = %message.id, "Failed to broadcast chat:new: {}", e);
        }

        Ok(message)
    }
}
