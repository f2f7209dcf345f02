//! Display-local image resources.
//!
//! Every band payload that reaches the viewer is wrapped in a
//! [`ResourceHandle`]. Dropping the handle releases it; the registry keeps
//! counters so tests and diagnostics can check that nothing leaks.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

#[derive(Debug, Default)]
struct Counters {
    next_id: AtomicU64,
    live: AtomicUsize,
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Allocator and bookkeeping for image resource handles.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    counters: Arc<Counters>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a payload and hand out a handle for it.
    pub fn acquire(&self, bytes: Bytes) -> ResourceHandle {
        let id = self.counters.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.counters.live.fetch_add(1, Ordering::AcqRel);
        self.counters.acquired.fetch_add(1, Ordering::Relaxed);
        trace!(id, size = bytes.len(), "Resource acquired");
        ResourceHandle {
            id,
            bytes,
            counters: self.counters.clone(),
        }
    }

    /// Handles currently alive.
    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::Acquire)
    }

    pub fn acquired(&self) -> u64 {
        self.counters.acquired.load(Ordering::Relaxed)
    }

    pub fn released(&self) -> u64 {
        self.counters.released.load(Ordering::Relaxed)
    }
}

/// Owned reference to one payload. Not clonable; released on drop.
#[derive(Debug)]
pub struct ResourceHandle {
    id: u64,
    bytes: Bytes,
    counters: Arc<Counters>,
}

impl ResourceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::AcqRel);
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        trace!(id = self.id, "Resource released");
    }
}
