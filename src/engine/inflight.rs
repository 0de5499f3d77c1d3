//! In-flight request tracking
//!
//! Requests that miss on the same key queue behind one async lock per key.
//! The first holder fetches and stores; the rest re-check the tier once they
//! get the lock and find the stored artifact. Dropping a waiting or holding
//! request releases its place, so cancellation never wedges a key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// Per-key async locks, dropped once no request holds or awaits them
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl InFlight {
    /// Wait for exclusive use of a key
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self.lock_for(key);
        if lock.try_lock().is_err() {
            trace!(key, "Waiting on in-flight request");
        }
        lock.lock_owned().await
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(lock) = locks.get(key).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Keys with a live lock
    #[cfg(test)]
    pub fn len(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.values().filter(|lock| lock.strong_count() > 0).count()
    }
}
