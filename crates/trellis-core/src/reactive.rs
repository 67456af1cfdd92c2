//! Published<T> - A versioned snapshot cell with change notifications
//!
//! `Published<T>` holds an immutable snapshot behind an `Arc` and replaces it
//! wholesale on every logical update. Readers always get a complete snapshot,
//! never a half-applied one, and each committed update increments the version
//! exactly once.
//!
//! # Runtime Agnostic Design
//!
//! Subscriptions are poll-based, as in the rest of the crate. Hosts that want
//! push notifications can poll from whatever loop or task they already run.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct PublishedInner<T> {
    /// Current snapshot. Only held for the duration of a pointer swap or clone.
    value: RwLock<Arc<T>>,
    /// Incremented once per committed update, under the `value` write lock.
    version: AtomicU64,
    /// Serializes writers so read-transform-replace never loses an update.
    writer: Mutex<()>,
}

/// A shared, versioned snapshot cell.
///
/// Updaters run while holding the writer lock but not the value lock, so they
/// may read this cell (or any other) freely. They must not write to the same
/// cell: the writer lock is not reentrant.
///
/// # Example
///
/// ```rust,ignore
/// use trellis_core::Published;
///
/// let counter = Published::new(0);
/// let mut sub = counter.subscribe();
///
/// counter.update(|n| (Some(n + 1), ()));
/// assert_eq!(*counter.get(), 1);
/// assert_eq!(sub.poll().as_deref(), Some(&1));
/// assert!(sub.poll().is_none());
/// ```
pub struct Published<T> {
    inner: Arc<PublishedInner<T>>,
}

impl<T> Clone for Published<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Published<T> {
    /// Create a cell holding `value` at version 0.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(PublishedInner {
                value: RwLock::new(Arc::new(value)),
                version: AtomicU64::new(0),
                writer: Mutex::new(()),
            }),
        }
    }

    /// Get the current snapshot.
    pub fn get(&self) -> Arc<T> {
        self.inner.value.read().clone()
    }

    /// Get the current version number.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Replace the snapshot unconditionally. Returns the new version.
    pub fn publish(&self, value: T) -> u64 {
        let _writer = self.inner.writer.lock();
        self.commit(value)
    }

    /// Read-transform-replace.
    ///
    /// `f` receives the current snapshot and returns the replacement (or
    /// `None` to publish nothing) plus a result for the caller. If `f` fails
    /// nothing is published.
    pub fn try_update<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&T) -> Result<(Option<T>, R), E>,
    {
        let _writer = self.inner.writer.lock();
        let current = self.get();
        let (next, out) = f(&current)?;
        if let Some(next) = next {
            self.commit(next);
        }
        Ok(out)
    }

    /// Infallible form of [`Published::try_update`].
    pub fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> (Option<T>, R),
    {
        let _writer = self.inner.writer.lock();
        let current = self.get();
        let (next, out) = f(&current);
        if let Some(next) = next {
            self.commit(next);
        }
        out
    }

    /// Subscribe to snapshot changes.
    ///
    /// The subscription starts at the current version, so only updates
    /// published after this call are reported by [`Subscription::poll`].
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            source: self.inner.clone(),
            last_version: self.version(),
        }
    }

    /// Check if two handles share the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // Callers hold the writer lock.
    fn commit(&self, value: T) -> u64 {
        let mut guard = self.inner.value.write();
        *guard = Arc::new(value);
        self.inner.version.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl<T: Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Published<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Published")
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}

/// A subscription to a [`Published`] cell for polling changes.
pub struct Subscription<T> {
    source: Arc<PublishedInner<T>>,
    last_version: u64,
}

impl<T> Subscription<T> {
    /// Check if the source has changed since the last poll.
    pub fn has_changed(&self) -> bool {
        self.source.version.load(Ordering::Acquire) > self.last_version
    }

    /// Poll for a new snapshot.
    ///
    /// Returns the latest snapshot if at least one update was published since
    /// the last poll. Intermediate snapshots are coalesced.
    pub fn poll(&mut self) -> Option<Arc<T>> {
        let guard = self.source.value.read();
        let current_version = self.source.version.load(Ordering::Acquire);
        if current_version > self.last_version {
            self.last_version = current_version;
            Some(guard.clone())
        } else {
            None
        }
    }

    /// Get the current snapshot regardless of whether it changed.
    pub fn get(&self) -> Arc<T> {
        self.source.value.read().clone()
    }

    /// Get the current version of the source.
    pub fn source_version(&self) -> u64 {
        self.source.version.load(Ordering::Acquire)
    }

    /// Get the last version this subscription observed.
    pub fn last_observed_version(&self) -> u64 {
        self.last_version
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("last_version", &self.last_version)
            .field("source_version", &self.source_version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_publish_increments_version() {
        let cell = Published::new(0);
        assert_eq!(cell.version(), 0);

        assert_eq!(cell.publish(1), 1);
        assert_eq!(cell.publish(2), 2);
        assert_eq!(*cell.get(), 2);
    }

    #[test]
    fn test_update_without_change_keeps_version() {
        let cell = Published::new(5);
        let seen = cell.update(|n| (None, *n));

        assert_eq!(seen, 5);
        assert_eq!(cell.version(), 0);
    }

    #[test]
    fn test_failed_update_publishes_nothing() {
        let cell = Published::new(1);
        let result: Result<(), &str> = cell.try_update(|_| Err("boom"));

        assert_eq!(result, Err("boom"));
        assert_eq!(cell.version(), 0);
        assert_eq!(*cell.get(), 1);
    }

    #[test]
    fn test_updater_may_read_the_cell() {
        let cell = Published::new(1);
        let reader = cell.clone();
        cell.update(|n| (Some(n + *reader.get()), ()));
        assert_eq!(*cell.get(), 2);
    }

    #[test]
    fn test_clone_shares_state() {
        let a = Published::new(0);
        let b = a.clone();
        a.publish(42);
        assert_eq!(*b.get(), 42);
    }

    #[test]
    fn test_subscription_poll() {
        let cell = Published::new(0);
        let mut sub = cell.subscribe();

        assert!(!sub.has_changed());
        assert!(sub.poll().is_none());

        cell.publish(1);
        cell.publish(2);
        assert!(sub.has_changed());
        assert_eq!(sub.poll().as_deref(), Some(&2));
        assert_eq!(sub.last_observed_version(), 2);
        assert!(sub.poll().is_none());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let cell = Published::new(0u64);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        cell.update(|n| (Some(n + 1), ()));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*cell.get(), 800);
        assert_eq!(cell.version(), 800);
    }
}
