use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per upload name.
///
/// Storing a part, reading the inventory and merging all happen while holding
/// the lock for that name, so two requests can never both see a complete upload
/// and merge it twice. Requests for different names never contend.
#[derive(Debug, Clone, Default)]
pub struct UploadLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl UploadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `name`. Released when the guard drops.
    pub async fn lock(&self, name: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await
        let mutex = self
            .locks
            .entry(name.to_string())
            .or_default()
            .value()
            .clone();
        mutex.lock_owned().await
    }

    /// Drops locks nobody holds or waits on. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        before - self.locks.len()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
