//! Per-name serialization of lifecycle operations

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// One async mutex per extension name; operations on different names interleave freely.
///
/// An entry only lives while someone holds or waits for it.
#[derive(Default)]
pub struct NamedLocks {
    locks: Mutex<LockMap>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other operation holds `name`
    pub async fn acquire(&self, name: &str) -> NamedGuard<'_> {
        let lock = self.map().entry(name.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        NamedGuard {
            locks: self,
            name: name.to_string(),
            guard: Some(guard),
        }
    }

    /// Names currently held or waited for
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held lock on one name; dropping it lets the next operation on that name run
pub struct NamedGuard<'a> {
    locks: &'a NamedLocks,
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NamedGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        // Clones are only made under the map lock, so a count of one means
        // nobody holds or waits for this name any more
        let mut map = self.locks.map();
        if map.get(&self.name).map_or(false, |lock| Arc::strong_count(lock) == 1) {
            map.remove(&self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_waits() {
        let locks = NamedLocks::new();
        let _held = locks.acquire("alpha").await;

        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire("alpha")).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_different_names_do_not_block() {
        let locks = NamedLocks::new();
        let _alpha = locks.acquire("alpha").await;

        let beta = tokio::time::timeout(Duration::from_millis(20), locks.acquire("beta")).await;
        assert!(beta.is_ok());
    }

    #[tokio::test]
    async fn test_released_names_are_forgotten() {
        let locks = NamedLocks::new();
        for name in ["ghost", "typo", "alpha"] {
            let _guard = locks.acquire(name).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_someone_waits() {
        let locks = NamedLocks::new();
        let first = locks.acquire("alpha").await;

        let (_, second) = tokio::join!(
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                drop(first);
            },
            locks.acquire("alpha")
        );

        assert_eq!(locks.len(), 1);
        drop(second);
        assert!(locks.is_empty());
    }
}
