//! Message formatting utilities for client display.

use chrono::{TimeZone, Utc};
use porchlight_server::infrastructure::dto::websocket::{CoordinatesDto, NotificationDto};
use porchlight_shared::time::timestamp_to_rfc3339;

use crate::chat_view::{ChatEntry, LocalStatus};

const RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the banner printed once a session has joined its rooms
    pub fn format_joined(booking_id: &str, me: &str) -> String {
        format!(
            "\n============================================================\n\
             Booking {} as '{}'\n\
             Type a message and press Enter. /retry resends failed messages, /quit exits.\n\
             ============================================================\n",
            booking_id, me
        )
    }

    /// Format a chat entry
    ///
    /// # Arguments
    ///
    /// * `entry` - The entry to show
    /// * `me` - The local user id (own messages are marked)
    pub fn format_chat_message(entry: &ChatEntry, me: &str) -> String {
        let who = if entry.sender_id == me {
            format!("@{} (me)", entry.sender_id)
        } else {
            format!("@{}", entry.sender_id)
        };
        let mut body = format!("\n\n{}\n{}: {}\n", RULE, who, entry.text);
        if let Some(url) = &entry.file_url {
            body.push_str(&format!("[file] {}\n", url));
        }
        body.push_str(&format!(
            "sent at {} [{}]\n{}\n",
            timestamp_to_rfc3339(entry.created_at),
            entry.status.as_str(),
            RULE
        ));
        body
    }

    /// Format a status change of one of the local user's messages
    pub fn format_status_change(text: &str, status: LocalStatus) -> String {
        format!("\n  \"{}\" → {}\n", Self::preview(text), status.as_str())
    }

    /// Format the result of a bulk status update
    pub fn format_bulk_status(count: usize, status: LocalStatus) -> String {
        format!("\n  {} message(s) → {}\n", count, status.as_str())
    }

    pub fn format_typing(users: &[String]) -> String {
        match users {
            [] => String::new(),
            [one] => format!("\n  {} is typing…\n", one),
            many => format!("\n  {} are typing…\n", many.join(", ")),
        }
    }

    /// Format a notification pushed to the local user
    pub fn format_notification(notification: &NotificationDto) -> String {
        format!(
            "\n🔔 {} ({}): {}\n",
            notification.title,
            notification.kind.as_str(),
            notification.message
        )
    }

    /// Format a live location update
    pub fn format_live_position(coords: &CoordinatesDto, received_at: i64) -> String {
        let clock = Utc
            .timestamp_millis_opt(received_at)
            .single()
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        format!("\n📍 {:.5}, {:.5} at {}\n", coords.lat, coords.lng, clock)
    }

    /// Format a rejection reported by the hub
    pub fn format_error(event: &str, reason: &str) -> String {
        format!("\n✖ {} rejected: {}\n", event, reason)
    }

    pub fn format_send_failed(text: &str, reason: &str) -> String {
        format!(
            "\n✖ \"{}\" was not sent ({}). Type /retry to resend.\n",
            Self::preview(text),
            reason
        )
    }

    /// Format a raw text frame (when decoding fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }

    fn preview(text: &str) -> String {
        const MAX_CHARS: usize = 24;
        if text.chars().count() <= MAX_CHARS {
            text.to_string()
        } else {
            let head: String = text.chars().take(MAX_CHARS).collect();
            format!("{}…", head)
        }
    }
}

#[cfg(test)]
mod tests {
    use porchlight_server::domain::NotificationType;

    use super::*;

    fn entry(sender: &str, status: LocalStatus) -> ChatEntry {
        ChatEntry {
            id: Some("m1".to_string()),
            client_key: None,
            sender_id: sender.to_string(),
            text: "Hello, world!".to_string(),
            file_url: None,
            status,
            created_at: 1672498800000,
        }
    }

    #[test]
    fn test_format_chat_message_from_other_party() {
        // テスト項目: 相手のメッセージには (me) が付かず、ステータスと時刻が表示される
        // given (前提条件):
        let entry = entry("worker", LocalStatus::Sent);

        // when (操作):
        let result = MessageFormatter::format_chat_message(&entry, "client");

        // then (期待する結果):
        assert!(result.contains("@worker: Hello, world!"));
        assert!(!result.contains("(me)"));
        assert!(result.contains("[sent]"));
        assert!(result.contains("2022-12-31T15:00:00"));
    }

    #[test]
    fn test_format_own_message_with_file() {
        // テスト項目: 自分のメッセージは (me) が付き、添付 URL が表示される
        // given (前提条件):
        let mut entry = entry("client", LocalStatus::Sending);
        entry.file_url = Some("https://cdn.example/a.png".to_string());

        // when (操作):
        let result = MessageFormatter::format_chat_message(&entry, "client");

        // then (期待する結果):
        assert!(result.contains("@client (me)"));
        assert!(result.contains("[file] https://cdn.example/a.png"));
        assert!(result.contains("[sending]"));
    }

    #[test]
    fn test_format_status_change_truncates_long_text() {
        // given (前提条件):
        let text = "a very long message that keeps going and going";

        // when (操作):
        let result = MessageFormatter::format_status_change(text, LocalStatus::Read);

        // then (期待する結果):
        assert!(result.contains("a very long message that…"));
        assert!(result.contains("read"));
    }

    #[test]
    fn test_format_typing() {
        // テスト項目: 入力中ユーザーの人数に応じて表示が変わる
        // when (操作):
        let none = MessageFormatter::format_typing(&[]);
        let one = MessageFormatter::format_typing(&["worker".to_string()]);
        let two = MessageFormatter::format_typing(&["a".to_string(), "b".to_string()]);

        // then (期待する結果):
        assert!(none.is_empty());
        assert!(one.contains("worker is typing"));
        assert!(two.contains("a, b are typing"));
    }

    #[test]
    fn test_format_notification() {
        // given (前提条件):
        let notification = NotificationDto {
            id: "n1".to_string(),
            user_id: "client".to_string(),
            actor_id: Some("worker".to_string()),
            kind: NotificationType::BookingUpdate,
            title: "Booking accepted".to_string(),
            message: "Your booking was accepted".to_string(),
            data: serde_json::json!({ "bookingId": "b1" }),
            read: false,
            created_at: 1672498800000,
        };

        // when (操作):
        let result = MessageFormatter::format_notification(&notification);

        // then (期待する結果):
        assert!(result.contains("Booking accepted"));
        assert!(result.contains("booking_update"));
    }

    #[test]
    fn test_format_live_position() {
        // テスト項目: 座標は小数 5 桁、時刻は UTC の時分秒で表示される
        // given (前提条件):
        let coords = CoordinatesDto { lat: 28.613939, lng: 77.209021 };

        // when (操作):
        let result = MessageFormatter::format_live_position(&coords, 1672498800000);

        // then (期待する結果):
        assert!(result.contains("28.61394, 77.20902"));
        assert!(result.contains("15:00:00"));
    }

    #[test]
    fn test_format_error() {
        // when (操作):
        let result = MessageFormatter::format_error("joinChat", "booking 'b9' not found");

        // then (期待する結果):
        assert!(result.contains("joinChat rejected: booking 'b9' not found"));
    }

    #[test]
    fn test_format_raw_message() {
        // テスト項目: デコードできないフレームはそのまま表示される
        // given (前提条件):
        let text = "unknown message format";

        // when (操作):
        let result = MessageFormatter::format_raw_message(text);

        // then (期待する結果):
        assert!(result.contains("unknown message format"));
        assert!(result.contains("Received:"));
    }
}
