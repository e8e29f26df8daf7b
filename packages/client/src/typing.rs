//! Typing indicator with an expiry.
//!
//! A `chat:typing` shows the indicator for [`TYPING_TIMEOUT_MS`]; another
//! `chat:typing` from the same user extends it, and `chat:stopTyping` hides
//! it immediately.

use std::collections::HashMap;

/// How long one `chat:typing` keeps the indicator visible.
pub const TYPING_TIMEOUT_MS: i64 = 1_200;

#[derive(Debug, Default)]
pub struct TypingIndicator {
    /// user id → expiry (unix millis)
    expires_at: HashMap<String, i64>,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `from` was not already shown as typing.
    pub fn on_typing(&mut self, from: &str, now_millis: i64) -> bool {
        let was_active = self.is_typing(from, now_millis);
        self.expires_at
            .insert(from.to_string(), now_millis + TYPING_TIMEOUT_MS);
        !was_active
    }

    /// Returns `true` when `from` was shown as typing.
    pub fn on_stop(&mut self, from: &str) -> bool {
        self.expires_at.remove(from).is_some()
    }

    pub fn is_typing(&self, from: &str, now_millis: i64) -> bool {
        self.expires_at
            .get(from)
            .is_some_and(|expiry| *expiry > now_millis)
    }

    /// Users currently typing, sorted.
    pub fn active(&self, now_millis: i64) -> Vec<String> {
        let mut users: Vec<String> = self
            .expires_at
            .iter()
            .filter(|(_, expiry)| **expiry > now_millis)
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        users
    }

    /// Drop expired entries and return who stopped typing.
    pub fn expire(&mut self, now_millis: i64) -> Vec<String> {
        let mut expired: Vec<String> = self
            .expires_at
            .iter()
            .filter(|(_, expiry)| **expiry <= now_millis)
            .map(|(user, _)| user.clone())
            .collect();
        expired.sort();
        for user in &expired {
            self.expires_at.remove(user);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_is_shown_until_timeout() {
        // テスト項目: chat:typing を受けてから 1.2 秒間だけ表示される
        // given (前提条件):
        let mut indicator = TypingIndicator::new();

        // when (操作):
        let started = indicator.on_typing("worker", 10_000);

        // then (期待する結果):
        assert!(started);
        assert!(indicator.is_typing("worker", 11_199));
        assert!(!indicator.is_typing("worker", 11_200));
    }

    #[test]
    fn test_repeated_typing_extends_the_indicator() {
        // テスト項目: 連続した chat:typing は表示期間を延長し、新規表示扱いにはならない
        // given (前提条件):
        let mut indicator = TypingIndicator::new();
        indicator.on_typing("worker", 10_000);

        // when (操作):
        let restarted = indicator.on_typing("worker", 11_000);

        // then (期待する結果):
        assert!(!restarted);
        assert!(indicator.is_typing("worker", 12_100));
    }

    #[test]
    fn test_stop_typing_hides_immediately() {
        // given (前提条件):
        let mut indicator = TypingIndicator::new();
        indicator.on_typing("worker", 10_000);

        // when (操作):
        let stopped = indicator.on_stop("worker");

        // then (期待する結果):
        assert!(stopped);
        assert!(indicator.active(10_001).is_empty());
        assert!(!indicator.on_stop("worker"));
    }

    #[test]
    fn test_expire_reports_each_user_once() {
        // テスト項目: 期限切れのユーザーは expire で一度だけ報告される
        // given (前提条件):
        let mut indicator = TypingIndicator::new();
        indicator.on_typing("client", 10_000);
        indicator.on_typing("worker", 10_500);

        // when (操作):
        let first = indicator.expire(11_300);
        let second = indicator.expire(11_300);

        // then (期待する結果):
        assert_eq!(first, vec!["client".to_string()]);
        assert!(second.is_empty());
        assert_eq!(indicator.active(11_300), vec!["worker".to_string()]);
    }
}
