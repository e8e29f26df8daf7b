//! Local view of one booking's chat thread.
//!
//! Messages typed by the user appear immediately as `Sending` entries keyed
//! by a fresh [`ClientKey`]. The REST result and the `chat:new` echo both
//! reconcile into that same entry, in whichever order they arrive.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 楽観的送信 → 確定 / 失敗 / 再送 の状態遷移
//! - `chat:new` の突き合わせ（サーバー ID → clientKey → 送信者+本文）
//! - ステータス更新の単調性（read から delivered に戻らない）
//!
//! ### どのような状況を想定しているか
//! - REST 応答より先に `chat:new` が届くケース、その逆のケース
//! - 同じ本文を連続送信したケース

use porchlight_server::{
    domain::{ClientKey, MessageStatus},
    infrastructure::dto::websocket::ChatMessageDto,
};

/// Status as the local user sees it.
///
/// `Sending` and `Failed` never leave the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
    Sending,
    Failed,
    Sent,
    Delivered,
    Read,
}

impl LocalStatus {
    /// Server-side progress; `None` while the message is unconfirmed.
    fn rank(&self) -> Option<u8> {
        match self {
            Self::Sending | Self::Failed => None,
            Self::Sent => Some(0),
            Self::Delivered => Some(1),
            Self::Read => Some(2),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.rank().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sending => "sending",
            Self::Failed => "failed",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl From<MessageStatus> for LocalStatus {
    fn from(status: MessageStatus) -> Self {
        match status {
            MessageStatus::Sent => Self::Sent,
            MessageStatus::Delivered => Self::Delivered,
            MessageStatus::Read => Self::Read,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    /// Server id; `None` until confirmed
    pub id: Option<String>,
    pub client_key: Option<String>,
    pub sender_id: String,
    pub text: String,
    pub file_url: Option<String>,
    pub status: LocalStatus,
    pub created_at: i64,
}

impl ChatEntry {
    fn from_persisted(message: &ChatMessageDto) -> Self {
        Self {
            id: Some(message.id.clone()),
            client_key: message.client_key.clone(),
            sender_id: message.sender_id.clone(),
            text: message.message.clone(),
            file_url: message.file_url.clone(),
            status: message.status.into(),
            created_at: message.created_at,
        }
    }

    /// Adopt the authoritative copy, never moving the status backwards.
    fn confirm_with(&mut self, message: &ChatMessageDto) {
        self.id = Some(message.id.clone());
        self.created_at = message.created_at;
        if message.file_url.is_some() {
            self.file_url = message.file_url.clone();
        }
        self.advance(message.status.into());
    }

    fn advance(&mut self, target: LocalStatus) -> bool {
        let Some(target_rank) = target.rank() else {
            return false;
        };
        match self.status.rank() {
            Some(current) if current >= target_rank => false,
            _ => {
                self.status = target;
                true
            }
        }
    }
}

/// How an incoming `chat:new` was folded into the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Already known by server id.
    Duplicate,
    /// Matched a local optimistic entry.
    Confirmed,
    /// A message not sent from this view.
    Appended,
    /// Belongs to another booking.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ChatView {
    booking_id: String,
    me: String,
    entries: Vec<ChatEntry>,
}

impl ChatView {
    pub fn new(booking_id: impl Into<String>, me: impl Into<String>) -> Self {
        Self {
            booking_id: booking_id.into(),
            me: me.into(),
            entries: Vec::new(),
        }
    }

    pub fn booking_id(&self) -> &str {
        &self.booking_id
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn entry(&self, client_key: &str) -> Option<&ChatEntry> {
        self.position_by_key(client_key).map(|i| &self.entries[i])
    }

    pub fn entry_by_id(&self, id: &str) -> Option<&ChatEntry> {
        self.position_by_id(id).map(|i| &self.entries[i])
    }

    /// Insert a `Sending` entry and return its idempotency key.
    pub fn send_optimistic(&mut self, text: impl Into<String>, now_millis: i64) -> String {
        let key = ClientKey::generate().into_string();
        self.entries.push(ChatEntry {
            id: None,
            client_key: Some(key.clone()),
            sender_id: self.me.clone(),
            text: text.into(),
            file_url: None,
            status: LocalStatus::Sending,
            created_at: now_millis,
        });
        key
    }

    /// Apply a successful REST send.
    pub fn confirm(&mut self, client_key: &str, persisted: &ChatMessageDto) -> bool {
        let Some(index) = self.position_by_key(client_key) else {
            return false;
        };
        // The chat:new echo may have been appended separately before the key matched
        if let Some(other) = self.position_by_id(&persisted.id)
            && other != index
        {
            let echoed = self.entries.remove(other);
            let index = if other < index { index - 1 } else { index };
            self.entries[index].confirm_with(persisted);
            self.entries[index].advance(echoed.status);
            return true;
        }
        self.entries[index].confirm_with(persisted);
        true
    }

    /// Mark an unconfirmed send as failed. Confirmed entries are left alone.
    pub fn fail(&mut self, client_key: &str) -> bool {
        match self.position_by_key(client_key) {
            Some(index) if self.entries[index].status == LocalStatus::Sending => {
                self.entries[index].status = LocalStatus::Failed;
                true
            }
            _ => false,
        }
    }

    /// Put a failed entry back to `Sending` and return the text to resend.
    pub fn retry(&mut self, client_key: &str) -> Option<String> {
        let index = self.position_by_key(client_key)?;
        let entry = &mut self.entries[index];
        if entry.status != LocalStatus::Failed {
            return None;
        }
        entry.status = LocalStatus::Sending;
        Some(entry.text.clone())
    }

    pub fn failed_keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.status == LocalStatus::Failed)
            .filter_map(|e| e.client_key.clone())
            .collect()
    }

    /// Fold an incoming `chat:new`.
    pub fn apply_new(&mut self, message: &ChatMessageDto) -> Reconciled {
        if message.booking_id != self.booking_id {
            return Reconciled::Ignored;
        }

        if let Some(index) = self.position_by_id(&message.id) {
            self.entries[index].advance(message.status.into());
            return Reconciled::Duplicate;
        }

        if let Some(key) = &message.client_key
            && let Some(index) = self.position_by_key(key)
        {
            self.entries[index].confirm_with(message);
            return Reconciled::Confirmed;
        }

        // Senders that do not echo a key: oldest unconfirmed entry with the same text
        if message.sender_id == self.me
            && let Some(index) = self.entries.iter().position(|e| {
                e.id.is_none() && !e.status.is_confirmed() && e.text == message.message
            })
        {
            self.entries[index].confirm_with(message);
            return Reconciled::Confirmed;
        }

        self.entries.push(ChatEntry::from_persisted(message));
        Reconciled::Appended
    }

    /// Fold `chat:update`. Returns whether anything changed.
    pub fn apply_update(
        &mut self,
        message_id: &str,
        status: MessageStatus,
        file_url: Option<&str>,
    ) -> bool {
        let Some(index) = self.position_by_id(message_id) else {
            return false;
        };
        let entry = &mut self.entries[index];
        let mut changed = entry.advance(status.into());
        if let Some(url) = file_url
            && entry.file_url.as_deref() != Some(url)
        {
            entry.file_url = Some(url.to_string());
            changed = true;
        }
        changed
    }

    /// Fold `chat:updateBulk`. Returns how many entries changed.
    ///
    /// A named reader only read what the other party sent them; without one
    /// every confirmed entry advances.
    pub fn apply_bulk_update(
        &mut self,
        booking_id: &str,
        status: MessageStatus,
        reader_id: Option<&str>,
    ) -> usize {
        if booking_id != self.booking_id {
            return 0;
        }
        let target = LocalStatus::from(status);
        self.entries
            .iter_mut()
            .filter(|e| e.status.is_confirmed())
            .filter(|e| reader_id.is_none_or(|reader| e.sender_id != reader))
            .map(|e| e.advance(target))
            .filter(|changed| *changed)
            .count()
    }

    fn position_by_key(&self, client_key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.client_key.as_deref() == Some(client_key))
    }

    fn position_by_id(&self, id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.id.as_deref() == Some(id))
    }
}
