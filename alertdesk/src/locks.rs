//! Keyed async mutual exclusion.
//!
//! Serializes the read-decide-write sequence of parent find-or-create per group
//! key, so two alerts racing for the same incident cannot both synthesize a
//! parent. Entries are dropped as soon as nobody holds or awaits them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

#[derive(Clone, Default)]
pub struct KeyedLocks {
    slots: Slots,
}

/// Holds the lock for one key until dropped.
pub struct KeyedGuard {
    key: String,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

fn slots(slots: &Slots) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: impl Into<String>) -> KeyedGuard {
        let key = key.into();
        let slot = slots(&self.slots).entry(key.clone()).or_default().clone();
        let guard = slot.lock_owned().await;
        KeyedGuard {
            key,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        slots(&self.slots).len()
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = slots(&self.slots);
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let first = locks.lock("rule|pay-api").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = contender.lock("rule|pay-api").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("a").await;
        let _b = locks.lock("b").await;
        assert_eq!(locks.active(), 2);
    }
}
