//! Per-key serialization

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

/// One async mutex per key, so operations on the same key run one at a
/// time while different keys proceed in parallel.
#[derive(Debug)]
pub(super) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
}

impl<K: Eq + Hash + Copy> KeyedLocks<K> {
    pub(super) fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub(super) async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub(super) fn forget(&self, key: K) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.remove(&key);
    }
}

/// Cancellation tokens for in-flight work, one per key
#[derive(Debug)]
pub(super) struct Cancellations<K> {
    tokens: Mutex<HashMap<K, CancellationToken>>,
}

impl<K: Eq + Hash + Copy> Cancellations<K> {
    pub(super) fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub(super) fn token(&self, key: K) -> CancellationToken {
        let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
        tokens.entry(key).or_default().clone()
    }

    /// Cancel everything running for `key` and forget the token
    pub(super) fn cancel(&self, key: K) {
        let token = {
            let mut tokens = self.tokens.lock().unwrap_or_else(|e| e.into_inner());
            tokens.remove(&key)
        };
        if let Some(token) = token {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock(1u64).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(1u64).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(1u64).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(2u64)).await;
        assert!(b.is_ok());
    }

    #[test]
    fn cancel_reaches_every_clone() {
        let cancellations = Cancellations::new();
        let token = cancellations.token(7u64);
        let same = cancellations.token(7u64);
        let other = cancellations.token(8u64);

        cancellations.cancel(7);
        assert!(token.is_cancelled());
        assert!(same.is_cancelled());
        assert!(!other.is_cancelled());

        // A later token for the key starts fresh
        assert!(!cancellations.token(7).is_cancelled());
    }
}
