//! Per-booking write locks shared by every use case that touches a booking.
//!
//! Booking repositories replace the whole document on `save`, so a
//! find → mutate → save cycle must not interleave with another one on the
//! same booking. Message sends take the same lock so room delivery order
//! equals persistence order.
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 同じ予約への処理が直列化され、別の予約はブロックしないこと
//! - 誰も保持・待機していないロックがマップから消えること

use std::{collections::HashMap, future::Future, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::BookingId;

/// Keyed mutexes, one per booking with pending work.
#[derive(Default)]
pub struct BookingLocks {
    locks: Mutex<HashMap<BookingId, Arc<Mutex<()>>>>,
}

impl BookingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` while holding the lock for `booking_id`.
    pub async fn run<F, T>(&self, booking_id: &BookingId, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let guard = self.acquire(booking_id).await;
        let result = work.await;
        self.release(booking_id, guard).await;
        result
    }

    async fn acquire(&self, booking_id: &BookingId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(booking_id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Forget the lock once nobody holds or waits for it.
    async fn release(&self, booking_id: &BookingId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.lock().await;
        if locks
            .get(booking_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(booking_id);
        }
    }

    #[cfg(test)]
    pub(crate) async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::booking_id;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_same_booking_work_does_not_interleave() {
        // テスト項目: 同じ予約の処理は先に入った方が終わるまで次が始まらない
        // given (前提条件):
        let locks = Arc::new(BookingLocks::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when (操作):
        let first = {
            let (locks, tx) = (locks.clone(), tx.clone());
            async move {
                locks
                    .run(&booking_id("b1"), async {
                        tx.send("first:start").unwrap();
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        tx.send("first:end").unwrap();
                    })
                    .await
            }
        };
        let second = {
            let (locks, tx) = (locks.clone(), tx.clone());
            async move {
                tokio::task::yield_now().await;
                locks
                    .run(&booking_id("b1"), async {
                        tx.send("second:start").unwrap();
                        tx.send("second:end").unwrap();
                    })
                    .await
            }
        };
        tokio::join!(first, second);
        drop(tx);

        // then (期待する結果):
        let mut order = Vec::new();
        while let Some(step) = rx.recv().await {
            order.push(step);
        }
        assert_eq!(order, vec!["first:start", "first:end", "second:start", "second:end"]);
        assert_eq!(locks.tracked().await, 0);
    }

    #[tokio::test]
    async fn test_other_booking_is_not_blocked() {
        // テスト項目: 別の予約のロックは保持中のロックを待たない
        // given (前提条件):
        let locks = BookingLocks::new();
        let held = locks.acquire(&booking_id("b1")).await;

        // when (操作):
        let other = tokio::time::timeout(
            Duration::from_millis(100),
            locks.run(&booking_id("b2"), async { 7 }),
        )
        .await;

        // then (期待する結果):
        assert_eq!(other.unwrap(), 7);
        assert_eq!(locks.tracked().await, 1);
        locks.release(&booking_id("b1"), held).await;
        assert_eq!(locks.tracked().await, 0);
    }
}
