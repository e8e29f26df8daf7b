//! One WebSocket session against the hub.
//!
//! A session connects with `?token=`, joins its rooms, backfills history
//! over REST and then runs three things side by side: the frame reader
//! (which also expires typing indicators), the frame writer, and the input
//! loop. Chat sends go through REST with an optimistic local entry.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 入力行のコマンド解釈（/quit, /retry, 通常の本文）
//! - 接続直後に送るイベントの順序
//! - 受信イベントの畳み込み（既読通知の返信、入力中表示、ステータス表示）
//!
//! ### どのような状況を想定しているか
//! - 相手からの新着メッセージを受信したとき chat:readOne を返す
//! - 自分のメッセージのエコーには何も返さない

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use porchlight_server::{
    domain::MessageStatus,
    infrastructure::dto::websocket::{ClientEvent, ReadOnePayload, ServerEvent},
};
use porchlight_shared::time::Clock;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    api::ChatApi,
    chat_view::{ChatEntry, ChatView, LocalStatus, Reconciled},
    error::ClientError,
    formatter::MessageFormatter,
    typing::TypingIndicator,
    ui::redisplay_prompt,
};

const TYPING_TICK: Duration = Duration::from_millis(250);

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Retry,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/quit" | "/exit" => Self::Quit,
            "/retry" => Self::Retry,
            text => Self::Send(text.to_string()),
        }
    }
}

/// Frames sent right after every (re)connect.
pub fn join_events(booking_id: &str, me: &str) -> Vec<ClientEvent> {
    vec![
        ClientEvent::JoinChat(booking_id.to_string()),
        ClientEvent::JoinNotifications(me.to_string()),
        ClientEvent::ChatRead(booking_id.to_string()),
    ]
}

/// What folding one hub event produced.
#[derive(Debug, Default)]
pub struct Folded {
    /// Text to print
    pub lines: Vec<String>,
    /// Frames to send back to the hub
    pub replies: Vec<ClientEvent>,
}

/// Apply one hub event to the local state.
pub fn fold_event(
    view: &mut ChatView,
    typing: &mut TypingIndicator,
    event: ServerEvent,
    now_millis: i64,
) -> Folded {
    let mut folded = Folded::default();
    match event {
        ServerEvent::ChatNew(message) => {
            if view.apply_new(&message) != Reconciled::Appended {
                return folded;
            }
            if let Some(entry) = view.entry_by_id(&message.id) {
                folded
                    .lines
                    .push(MessageFormatter::format_chat_message(entry, view.me()));
            }
            if message.sender_id != view.me() {
                typing.on_stop(&message.sender_id);
                folded.replies.push(ClientEvent::ChatReadOne(ReadOnePayload {
                    booking_id: message.booking_id,
                    msg_id: message.id,
                }));
            }
        }
        ServerEvent::ChatUpdate(update) => {
            if !view.apply_update(&update.msg_id, update.status, update.file_url.as_deref()) {
                return folded;
            }
            if let Some(entry) = view.entry_by_id(&update.msg_id)
                && entry.sender_id == view.me()
            {
                folded
                    .lines
                    .push(MessageFormatter::format_status_change(&entry.text, entry.status));
            }
        }
        ServerEvent::ChatUpdateBulk(update) => {
            let changed = view.apply_bulk_update(
                &update.booking_id,
                update.status,
                update.reader_id.as_deref(),
            );
            if changed > 0 {
                folded.lines.push(MessageFormatter::format_bulk_status(
                    changed,
                    LocalStatus::from(update.status),
                ));
            }
        }
        ServerEvent::ChatTyping(notice) => {
            if notice.booking_id == view.booking_id()
                && notice.from != view.me()
                && typing.on_typing(&notice.from, now_millis)
            {
                folded
                    .lines
                    .push(MessageFormatter::format_typing(&typing.active(now_millis)));
            }
        }
        ServerEvent::ChatStopTyping(notice) => {
            typing.on_stop(&notice.from);
        }
        ServerEvent::LiveUpdate(position) => {
            folded.lines.push(MessageFormatter::format_live_position(
                &position.coords,
                now_millis,
            ));
        }
        ServerEvent::NotificationNew(notification) => {
            folded
                .lines
                .push(MessageFormatter::format_notification(&notification));
        }
        ServerEvent::AdminStatsUpdated(_) => {
            tracing::debug!("Ignoring admin stats broadcast");
        }
        ServerEvent::Error(rejection) => {
            folded
                .lines
                .push(MessageFormatter::format_error(&rejection.event, &rejection.reason));
        }
    }
    folded
}

fn encode(event: &ClientEvent) -> Result<Message, ClientError> {
    Ok(Message::Text(serde_json::to_string(event)?.into()))
}

fn print_lines(lines: &[String], me: &str) {
    if lines.is_empty() {
        return;
    }
    for line in lines {
        print!("{}", line);
    }
    redisplay_prompt(me);
}

/// State that survives reconnects.
pub struct Session {
    ws_url: String,
    token: String,
    api: ChatApi,
    view: Arc<Mutex<ChatView>>,
    typing: Arc<Mutex<TypingIndicator>>,
    clock: Arc<dyn Clock>,
}

impl Session {
    pub fn new(
        ws_url: impl Into<String>,
        token: impl Into<String>,
        api: ChatApi,
        view: ChatView,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            token: token.into(),
            api,
            view: Arc::new(Mutex::new(view)),
            typing: Arc::new(Mutex::new(TypingIndicator::new())),
            clock,
        }
    }

    /// Snapshot of the local chat thread.
    pub async fn entries(&self) -> Vec<ChatEntry> {
        self.view.lock().await.entries().to_vec()
    }

    /// Run until the user quits (`Ok`) or the connection fails (`Err`).
    pub async fn run(&self, input: &mut mpsc::UnboundedReceiver<String>) -> Result<(), ClientError> {
        let url = format!("{}?token={}", self.ws_url, self.token);
        let (ws_stream, _) = match connect_async(&url).await {
            Ok(result) => result,
            Err(tungstenite::Error::Http(response)) if response.status().as_u16() == 401 => {
                return Err(ClientError::Unauthorized);
            }
            Err(e) => return Err(ClientError::Connection(e.to_string())),
        };

        tracing::info!("Connected to porchlight hub");

        let (booking_id, me) = {
            let view = self.view.lock().await;
            (view.booking_id().to_string(), view.me().to_string())
        };

        let (mut write, mut read) = ws_stream.split();

        // Rooms belong to the connection; join on every connect
        for event in join_events(&booking_id, &me) {
            write
                .send(encode(&event)?)
                .await
                .map_err(|e| ClientError::Connection(e.to_string()))?;
        }
        print!("{}", MessageFormatter::format_joined(&booking_id, &me));
        for reply in self.backfill(&booking_id).await {
            write
                .send(encode(&reply)?)
                .await
                .map_err(|e| ClientError::Connection(e.to_string()))?;
        }
        redisplay_prompt(&me);

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientEvent>();

        let mut write_task = tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                let frame = match encode(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!("Failed to encode {}: {}", event.name(), e);
                        continue;
                    }
                };
                if let Err(e) = write.send(frame).await {
                    tracing::warn!("Failed to send frame: {}", e);
                    break;
                }
            }
        });

        let view = self.view.clone();
        let typing = self.typing.clone();
        let clock = self.clock.clone();
        let me_for_read = me.clone();
        let replies = outbound_tx.clone();
        let mut read_task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(TYPING_TICK);
            loop {
                tokio::select! {
                    message = read.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            let now = clock.now_millis();
                            let folded = match serde_json::from_str::<ServerEvent>(&text) {
                                Ok(event) => {
                                    let mut view = view.lock().await;
                                    let mut typing = typing.lock().await;
                                    fold_event(&mut view, &mut typing, event, now)
                                }
                                Err(_) => Folded {
                                    lines: vec![MessageFormatter::format_raw_message(&text)],
                                    replies: Vec::new(),
                                },
                            };
                            for reply in folded.replies {
                                if replies.send(reply).is_err() {
                                    break;
                                }
                            }
                            print_lines(&folded.lines, &me_for_read);
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!("Server closed the connection");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!("WebSocket read error: {}", e);
                            break;
                        }
                        Some(Ok(_)) => {}
                    },
                    _ = tick.tick() => {
                        let expired = typing.lock().await.expire(clock.now_millis());
                        if !expired.is_empty() {
                            tracing::debug!(?expired, "Typing indicator expired");
                        }
                    }
                }
            }
        });

        let result = loop {
            tokio::select! {
                _ = &mut read_task => break Err(ClientError::ConnectionLost),
                _ = &mut write_task => break Err(ClientError::ConnectionLost),
                line = input.recv() => match line.map(|l| Command::parse(&l)) {
                    None | Some(Command::Quit) => break Ok(()),
                    Some(Command::Retry) => self.retry_failed(&booking_id, &me).await,
                    Some(Command::Send(text)) => self.send_text(&booking_id, &me, text).await,
                },
            }
        };

        read_task.abort();
        write_task.abort();
        result
    }

    /// Fold the persisted history in; covers messages missed while offline.
    ///
    /// Returns `chat:readOne` frames for unread messages from the other party.
    async fn backfill(&self, booking_id: &str) -> Vec<ClientEvent> {
        let messages = match self.api.history(booking_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Failed to load chat history: {}", e);
                return Vec::new();
            }
        };
        let mut view = self.view.lock().await;
        let mut replies = Vec::new();
        for message in messages {
            if view.apply_new(&message) != Reconciled::Appended {
                continue;
            }
            if let Some(entry) = view.entry_by_id(&message.id) {
                print!("{}", MessageFormatter::format_chat_message(entry, view.me()));
            }
            if message.sender_id != view.me() && message.status != MessageStatus::Read {
                replies.push(ClientEvent::ChatReadOne(ReadOnePayload {
                    booking_id: message.booking_id,
                    msg_id: message.id,
                }));
            }
        }
        replies
    }

    async fn send_text(&self, booking_id: &str, me: &str, text: String) {
        let key = self
            .view
            .lock()
            .await
            .send_optimistic(text.clone(), self.clock.now_millis());
        self.deliver(booking_id, me, &key, &text).await;
    }

    async fn retry_failed(&self, booking_id: &str, me: &str) {
        let keys = self.view.lock().await.failed_keys();
        if keys.is_empty() {
            println!("\nNothing to retry");
            redisplay_prompt(me);
            return;
        }
        for key in keys {
            let text = self.view.lock().await.retry(&key);
            if let Some(text) = text {
                self.deliver(booking_id, me, &key, &text).await;
            }
        }
    }

    async fn deliver(&self, booking_id: &str, me: &str, key: &str, text: &str) {
        match self.api.send_message(booking_id, text, key).await {
            Ok(persisted) => {
                let mut view = self.view.lock().await;
                view.confirm(key, &persisted);
                let status = view.entry(key).map(|e| e.status).unwrap_or(LocalStatus::Sent);
                print!("{}", MessageFormatter::format_status_change(text, status));
            }
            Err(e) => {
                tracing::warn!("Send failed: {}", e);
                self.view.lock().await.fail(key);
                print!("{}", MessageFormatter::format_send_failed(text, &e.to_string()));
            }
        }
        redisplay_prompt(me);
    }
}
