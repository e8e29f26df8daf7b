//! Live-push deduplication for notifications.
//!
//! A single logical domain event sometimes reaches the notify path more than
//! once in quick succession. Persistence always happens; this guard only
//! decides whether the live `notification:new` push goes out.

use std::{collections::HashMap, fmt, sync::Arc};

use porchlight_shared::time::Clock;
use tokio::sync::Mutex;

use super::entity::Notification;

pub const DEFAULT_DEDUP_WINDOW_MS: i64 = 2_000;
pub const DEFAULT_DEDUP_CAPACITY: usize = 10_000;

/// Composite key: recipient, type, title and correlating id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn for_notification(notification: &Notification) -> Self {
        Self(format!(
            "{}|{}|{}|{}",
            notification.recipient_id,
            notification.kind.as_str(),
            notification.title,
            notification.correlating_id()
        ))
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-local table of the last live emission per key.
///
/// Entries older than the window are evicted lazily on every check, and the
/// table never grows past `capacity` (the oldest entry goes first).
pub struct DedupGuard {
    clock: Arc<dyn Clock>,
    window_ms: i64,
    capacity: usize,
    last_emitted: Mutex<HashMap<DedupKey, i64>>,
}

impl DedupGuard {
    pub fn new(clock: Arc<dyn Clock>, window_ms: i64, capacity: usize) -> Self {
        Self {
            clock,
            window_ms,
            capacity: capacity.max(1),
            last_emitted: Mutex::new(HashMap::new()),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Decide whether a push for `key` may go out now, and record it if so.
    pub async fn try_acquire(&self, key: &DedupKey) -> bool {
        let now = self.clock.now_millis();
        let mut table = self.last_emitted.lock().await;

        table.retain(|_, emitted_at| now - *emitted_at <= self.window_ms);

        if let Some(emitted_at) = table.get(key)
            && now - *emitted_at <= self.window_ms
        {
            return false;
        }

        if table.len() >= self.capacity
            && !table.contains_key(key)
            && let Some(oldest) = table
                .iter()
                .min_by_key(|(_, emitted_at)| **emitted_at)
                .map(|(k, _)| k.clone())
        {
            table.remove(&oldest);
        }

        table.insert(key.clone(), now);
        true
    }

    /// Number of keys currently tracked.
    pub async fn len(&self) -> usize {
        self.last_emitted.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
