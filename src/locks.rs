use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

type Locks = Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>;

/// One async mutex per namespace file, created on first use and removed
/// again when the last holder releases it.
///
/// Unrelated identities never wait on each other; writers to the same file
/// queue up behind the lock for that path.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Locks,
}

/// Exclusive access to one path. Dropping it unlocks the path and forgets
/// the entry if nobody else holds or awaits it.
#[derive(Debug)]
pub struct PathGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a Locks,
    path: PathBuf,
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Waiters clone the Arc under this map lock, so a count of one
        // means the map holds the only reference.
        if locks
            .get(&self.path)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.path);
        }
    }
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &Path) -> PathGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        PathGuard {
            guard: Some(lock.lock_owned().await),
            locks: &self.locks,
            path: path.to_path_buf(),
        }
    }

    /// Drops entries nobody is holding or waiting on. Only needed after a
    /// waiter was cancelled while another task held the path.
    pub fn prune(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
