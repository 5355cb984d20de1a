//! Atomically replaceable read-mostly snapshots
//!
//! Readers grab an `Arc<T>` and keep it for the whole query; a reload swaps
//! the pointer so later readers see the new value and nobody sees a partial
//! update.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct SnapshotCell<T> {
    inner: ArcSwap<T>,
    generation: AtomicU64,
}

impl<T> SnapshotCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: ArcSwap::from_pointee(value),
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_arc(value: Arc<T>) -> Self {
        Self {
            inner: ArcSwap::new(value),
            generation: AtomicU64::new(0),
        }
    }

    /// Current snapshot
    #[inline]
    pub fn load(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Replace the snapshot, returning the previous one
    pub fn replace(&self, value: T) -> Arc<T> {
        self.store(Arc::new(value))
    }

    /// Replace with an already shared value
    pub fn store(&self, value: Arc<T>) -> Arc<T> {
        let previous = self.inner.swap(value);
        self.generation.fetch_add(1, Ordering::Relaxed);
        previous
    }

    /// Number of replacements since construction
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SnapshotCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCell")
            .field("value", &self.inner.load())
            .field("generation", &self.generation())
            .finish()
    }
}
