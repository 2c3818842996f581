//! # Keyed Mutex
//!
//! Mutual exclusion scoped by string key: callers acquire a lock for a key,
//! await any prior holder's release, and hold a guard that releases on every
//! exit path. Unrelated keys never contend.
//!
//! The queue entry for a key is dropped once the last holder or waiter for
//! that key is gone, so the internal map stays bounded by the number of keys
//! currently in use.
//!
//! The service is owned by the node runtime and passed explicitly to the
//! components that need it; there is no ambient singleton.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

struct KeyState {
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Holders plus waiters currently interested in this key.
    interested: usize,
}

/// Keyed mutual-exclusion service.
#[derive(Default)]
pub struct KeyedMutex {
    keys: Mutex<HashMap<String, KeyState>>,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting behind any current holder.
    ///
    /// The returned guard releases the key when dropped, on every exit path.
    pub async fn acquire(self: &Arc<Self>, key: &str) -> KeyedGuard {
        let lock = {
            let mut keys = self.keys.lock();
            let state = keys.entry(key.to_owned()).or_insert_with(|| KeyState {
                lock: Arc::new(tokio::sync::Mutex::new(())),
                interested: 0,
            });
            state.interested += 1;
            Arc::clone(&state.lock)
        };

        let guard = lock.lock_owned().await;
        KeyedGuard {
            owner: Arc::clone(self),
            key: key.to_owned(),
            guard: Some(guard),
        }
    }

    /// Number of keys with at least one holder or waiter.
    pub fn active_keys(&self) -> usize {
        self.keys.lock().len()
    }

    fn release(&self, key: &str) {
        let mut keys = self.keys.lock();
        if let Some(state) = keys.get_mut(key) {
            state.interested -= 1;
            if state.interested == 0 {
                keys.remove(key);
            }
        }
    }
}

/// Guard holding one key of a [`KeyedMutex`].
pub struct KeyedGuard {
    owner: Arc<KeyedMutex>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Release the underlying mutex before retiring the queue entry so a
        // fresh entry for the key can never race a still-held lock.
        self.guard.take();
        self.owner.release(&self.key);
    }
}
