//! Upload progress: an atomic byte counter published through a watch channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Shared progress of the transfer currently being tracked.
///
/// The published fraction only ever grows while a transfer runs: chunks may
/// complete in any order, and a completion that computed a lower fraction
/// than one already published is dropped.
#[derive(Clone)]
pub struct Progress {
    inner: Arc<Inner>,
}

struct Inner {
    done: AtomicU64,
    total: AtomicU64,
    tx: watch::Sender<f64>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0.0);
        Self {
            inner: Arc::new(Inner {
                done: AtomicU64::new(0),
                total: AtomicU64::new(0),
                tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.inner.tx.subscribe()
    }

    /// Last published fraction in `[0.0, 1.0]`.
    pub fn value(&self) -> f64 {
        *self.inner.tx.borrow()
    }

    /// Reset for a new transfer of `total` bytes.
    pub fn begin(&self, total: u64) {
        self.inner.total.store(total, Ordering::Release);
        self.inner.done.store(0, Ordering::Release);
        self.inner.tx.send_replace(0.0);
    }

    /// Record `bytes` more completed bytes.
    pub fn advance(&self, bytes: u64) {
        let done = self.inner.done.fetch_add(bytes, Ordering::AcqRel) + bytes;
        let total = self.inner.total.load(Ordering::Acquire);
        let fraction = if total == 0 {
            1.0
        } else {
            (done as f64 / total as f64).min(1.0)
        };
        self.inner.tx.send_if_modified(|current| {
            if fraction > *current {
                *current = fraction;
                true
            } else {
                false
            }
        });
    }

    /// Mark the transfer complete.
    pub fn finish(&self) {
        self.inner.tx.send_if_modified(|current| {
            let changed = *current != 1.0;
            *current = 1.0;
            changed
        });
    }
}
