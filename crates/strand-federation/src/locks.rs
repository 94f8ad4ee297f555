//! Per-key async locks.
//!
//! Each key maps to its own `tokio` mutex, created on first use and dropped
//! from the map once the last holder or waiter lets go.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct KeyedLocks {
  locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds one key until dropped.
#[must_use = "the key is released as soon as the guard is dropped"]
pub struct KeyGuard<'a> {
  owner: &'a KeyedLocks,
  key:   String,
  guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
  pub fn new() -> Self { Self::default() }

  pub async fn lock(&self, key: impl Into<String>) -> KeyGuard<'_> {
    let key = key.into();
    // the map entry guard must be gone before awaiting
    let mutex = Arc::clone(&self.locks.entry(key.clone()).or_default());
    let guard = mutex.lock_owned().await;
    KeyGuard {
      owner: self,
      key,
      guard: Some(guard),
    }
  }

  /// Number of keys currently held or waited on.
  pub fn len(&self) -> usize { self.locks.len() }

  pub fn is_empty(&self) -> bool { self.locks.is_empty() }
}

impl KeyGuard<'_> {
  pub fn key(&self) -> &str { &self.key }
}

impl Drop for KeyGuard<'_> {
  fn drop(&mut self) {
    drop(self.guard.take());
    self
      .owner
      .locks
      .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
  };

  use super::*;

  #[tokio::test]
  async fn entries_are_removed_after_release() {
    let locks = KeyedLocks::new();
    {
      let guard = locks.lock("comment:c1").await;
      assert_eq!(guard.key(), "comment:c1");
      assert_eq!(locks.len(), 1);
    }
    assert!(locks.is_empty());
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn same_key_is_exclusive() {
    let locks = Arc::new(KeyedLocks::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..8)
      .map(|_| {
        let (locks, inside, peak) = (locks.clone(), inside.clone(), peak.clone());
        tokio::spawn(async move {
          let _guard = locks.lock("person:s@node1").await;
          let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
          peak.fetch_max(now, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(5)).await;
          inside.fetch_sub(1, Ordering::SeqCst);
        })
      })
      .collect();
    for task in tasks {
      task.await.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(locks.is_empty());
  }

  #[tokio::test]
  async fn different_keys_do_not_block() {
    let locks = KeyedLocks::new();
    let _a = locks.lock("aspect:a").await;
    let _b = locks.lock("aspect:b").await;
    assert_eq!(locks.len(), 2);
  }
}
