#![forbid(unsafe_code)]

//! Attachment handles with idempotent disposal.
//!
//! # Design
//!
//! [`Subscription`] is a cheaply cloneable handle (`Arc` inside) over a
//! one-shot teardown closure. Disposing any clone runs the teardown exactly
//! once; every later call, on any clone, is a no-op. Dropping the last clone
//! also disposes, so a subscription held only for its side effect can be
//! bound to a scope RAII-style. Call [`detach()`](Subscription::detach) to
//! keep the underlying attachment alive past the last handle.
//!
//! Teardown closures hold only weak back-references into the signal engine,
//! so a subscription never forms a strong cycle with the signal it came
//! from.
//!
//! # Invariants
//!
//! 1. The teardown runs at most once, no matter how many clones exist or
//!    how disposal and drops interleave.
//! 2. `dispose()` on an already-disposed handle is a no-op, not an error.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// ─── Metrics counters ────────────────────────────────────────────────────────

/// Total number of subscription teardowns that have run.
static DISPOSALS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Read the total disposal count (for diagnostics/telemetry).
#[must_use]
pub fn disposals_total() -> u64 {
    DISPOSALS_TOTAL.load(Ordering::Relaxed)
}

// ─── Subscription ────────────────────────────────────────────────────────────

type Teardown = Box<dyn FnOnce() + Send>;

struct SubscriptionInner {
    disposed: AtomicBool,
    /// Present until the teardown runs or the handle is detached.
    teardown: Mutex<Option<Teardown>>,
}

impl SubscriptionInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let teardown = match self.teardown.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(teardown) = teardown {
            DISPOSALS_TOTAL.fetch_add(1, Ordering::Relaxed);
            teardown();
        }
    }
}

impl Drop for SubscriptionInner {
    fn drop(&mut self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(slot) = self.teardown.get_mut() {
            if let Some(teardown) = slot.take() {
                DISPOSALS_TOTAL.fetch_add(1, Ordering::Relaxed);
                teardown();
            }
        }
    }
}

/// Handle for one attachment of an observer to a signal.
///
/// Clones share the same teardown. The attachment is released when any
/// clone is disposed or when the last clone is dropped, whichever comes
/// first.
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Wrap a teardown closure.
    pub(crate) fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                disposed: AtomicBool::new(false),
                teardown: Mutex::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// A subscription that was never attached (e.g. an observation of an
    /// already-terminated signal). Born disposed; disposal is a no-op.
    pub(crate) fn disposed() -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                disposed: AtomicBool::new(true),
                teardown: Mutex::new(None),
            }),
        }
    }

    /// Release the attachment. Idempotent across all clones.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether the teardown has already run (or the handle was born
    /// disposed).
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Consume this handle without disposing, leaving the attachment alive
    /// for the signal's lifetime. Affects all clones: the teardown is
    /// defused, so a later `dispose()` does nothing.
    pub fn detach(self) {
        if let Ok(mut slot) = self.inner.teardown.lock() {
            slot.take();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
