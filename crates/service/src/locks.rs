//! Keyed async locks.
//!
//! Serializes operations that touch the same record set: two concurrent
//! votes by the same voter on the same target take the same key, while
//! unrelated users never contend. Lock entries are kept for the lifetime of
//! the service; the population is bounded by the set of (voter, target) and
//! user keys seen.

use commio_types::{ContentId, ContentKind, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serialization key for one facade operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum LockKey {
    /// Per-user operations (content events, reversals, refills).
    User(UserId),
    /// Per-vote operations (one voter, one target).
    Vote(UserId, ContentId, ContentKind),
}

/// Registry of per-key async mutexes.
#[derive(Default)]
pub(crate) struct KeyedLocks {
    inner: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `key`, waiting if another holder has it.
    pub async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(key).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_keys_distinguish_kind() {
        let a = LockKey::Vote(UserId(1), ContentId(2), ContentKind::Question);
        let b = LockKey::Vote(UserId(1), ContentId(2), ContentKind::Answer);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = KeyedLocks::new();
        let key = LockKey::User(UserId(1));

        let guard = locks.acquire(key).await;

        // The second holder must wait until the first guard drops
        let lock = {
            let mut map = locks.inner.lock().await;
            Arc::clone(map.entry(key).or_default())
        };
        assert!(lock.try_lock().is_err());

        drop(guard);
        assert!(lock.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_independent() {
        let locks = KeyedLocks::new();

        let _first = locks.acquire(LockKey::User(UserId(1))).await;
        // Acquiring a different key completes immediately
        let _second = locks.acquire(LockKey::User(UserId(2))).await;
    }
}
