#![forbid(unsafe_code)]

//! Signal engine: attachment, fan-out, and exactly-once termination.
//!
//! # Design
//!
//! [`Signal<V, E>`] is a cheaply cloneable handle (`Arc` inside) over a
//! shared core. The core keeps its observers in an attachment-ordered
//! registry guarded by a writer mutex, and republishes a copy-on-write
//! snapshot (`ArcSwap`) on every registry change. The send path loads the
//! snapshot lock-free, so attach/detach never blocks an in-flight fan-out
//! and an observer attached strictly after a `send` began is not delivered
//! that event.
//!
//! Delivery is synchronous and push-only: an event runs down the whole
//! observer list, on the producer's thread, before `send` returns. There is
//! no buffering and no backpressure; a slow observer simply makes the
//! producer's `send` take longer.
//!
//! # Invariants
//!
//! 1. Exactly one terminal event is delivered per attachment, or zero if
//!    the signal is abandoned; no event of any kind follows it.
//! 2. Fan-out visits observers in attachment order.
//! 3. Deliveries to one observer never interleave (serialized per slot).
//! 4. Attaching to a terminated signal delivers nothing: no replay of the
//!    stored terminal event. The returned subscription is born disposed.
//! 5. Events sent after termination are dropped silently, counted in
//!    [`post_terminal_sends_total`], and logged at WARN under the `tracing`
//!    feature.
//!
//! # Failure Modes
//!
//! - **Re-entrant send**: an observer that sends back into the signal it is
//!   observing deadlocks its own delivery (the slot is serialized by a
//!   non-reentrant mutex). This indicates a design bug in the subscriber
//!   graph. Sending into a *different* signal — the normal operator case —
//!   is fine.
//! - **Observer panic**: a panicking callback poisons its slot; later
//!   events to that observer are dropped. Other observers are unaffected.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::event::Event;
use crate::observer::Observer;
use crate::subscription::Subscription;

// Import tracing macros (no-op when tracing feature is disabled).
#[cfg(feature = "tracing")]
use crate::logging::{trace, warn};
#[cfg(not(feature = "tracing"))]
use crate::{trace, warn};

// ─── Metrics counters ────────────────────────────────────────────────────────

/// Total number of signals created via [`Signal::pipe`].
static SIGNALS_CREATED_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Total number of events dropped because they arrived after a terminal.
static POST_TERMINAL_SENDS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Read the total signal creation count (for diagnostics/telemetry).
#[must_use]
pub fn signals_created_total() -> u64 {
    SIGNALS_CREATED_TOTAL.load(Ordering::Relaxed)
}

/// Read the total count of events dropped after termination.
#[must_use]
pub fn post_terminal_sends_total() -> u64 {
    POST_TERMINAL_SENDS_TOTAL.load(Ordering::Relaxed)
}

// ─── Slot ────────────────────────────────────────────────────────────────────

pub(crate) type Callback<V, E> = Box<dyn FnMut(Event<V, E>) + Send>;

/// One attached observer: its callback plus terminal bookkeeping.
///
/// The callback mutex serializes deliveries to this observer; the
/// slot-local terminated flag enforces terminal-exactly-once even when a
/// raced value delivery arrives through a stale fan-out snapshot.
struct Slot<V, E> {
    callback: Mutex<Callback<V, E>>,
    terminated: AtomicBool,
}

impl<V, E> Slot<V, E> {
    fn new(callback: Callback<V, E>) -> Arc<Self> {
        Arc::new(Self {
            callback: Mutex::new(callback),
            terminated: AtomicBool::new(false),
        })
    }

    fn deliver(&self, event: Event<V, E>) {
        let Ok(mut callback) = self.callback.lock() else {
            // Poisoned by an earlier observer panic; drop the delivery.
            return;
        };
        // Checked under the callback lock so the decision and the delivery
        // are one atomic step per observer.
        if self.terminated.load(Ordering::Relaxed) {
            return;
        }
        if event.is_terminal() {
            self.terminated.store(true, Ordering::Relaxed);
        }
        (callback)(event);
    }

    /// Stop further deliveries without invoking the callback.
    fn silence(&self) {
        self.terminated.store(true, Ordering::Relaxed);
    }
}

// ─── Core ────────────────────────────────────────────────────────────────────

struct Registry<V, E> {
    /// Attached slots, sorted by key; keys are assigned monotonically, so
    /// iteration order is attachment order and detach is a binary search.
    slots: Vec<(u64, Arc<Slot<V, E>>)>,
    next_key: u64,
    /// Subscriptions this core owns on its upstream signal(s). Released
    /// exactly once: on termination, or when the last downstream observer
    /// detaches, whichever comes first.
    upstream: Vec<Subscription>,
}

pub(crate) struct Core<V, E> {
    registry: Mutex<Registry<V, E>>,
    /// Fan-out snapshot, republished on every registry change.
    snapshot: ArcSwap<Vec<Arc<Slot<V, E>>>>,
    /// Set exactly once, under the registry lock, by the first terminal.
    terminated: AtomicBool,
}

impl<V, E> Core<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry {
                slots: Vec::new(),
                next_key: 0,
                upstream: Vec::new(),
            }),
            snapshot: ArcSwap::from_pointee(Vec::new()),
            terminated: AtomicBool::new(false),
        })
    }

    fn publish(&self, registry: &Registry<V, E>) {
        let snapshot: Vec<Arc<Slot<V, E>>> = registry
            .slots
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        self.snapshot.store(Arc::new(snapshot));
    }

    pub(crate) fn attach(self: &Arc<Self>, callback: Callback<V, E>) -> Subscription {
        let key = {
            let Ok(mut registry) = self.registry.lock() else {
                return Subscription::disposed();
            };
            // No replay: observers attaching after the terminal see nothing.
            if self.terminated.load(Ordering::Acquire) {
                return Subscription::disposed();
            }
            let key = registry.next_key;
            registry.next_key += 1;
            registry.slots.push((key, Slot::new(callback)));
            self.publish(&registry);
            key
        };
        trace!(key, "observer attached");
        let core = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(core) = core.upgrade() {
                core.detach(key);
            }
        })
    }

    fn detach(&self, key: u64) {
        let released = {
            let Ok(mut registry) = self.registry.lock() else {
                return;
            };
            let Ok(idx) = registry.slots.binary_search_by_key(&key, |(k, _)| *k) else {
                // Already removed: terminated, or a raced teardown.
                return;
            };
            let (_, slot) = registry.slots.remove(idx);
            slot.silence();
            self.publish(&registry);
            if registry.slots.is_empty() {
                std::mem::take(&mut registry.upstream)
            } else {
                Vec::new()
            }
        };
        trace!(key, "observer detached");
        // Upstream release happens outside the registry lock.
        for subscription in &released {
            subscription.dispose();
        }
    }

    pub(crate) fn send(&self, event: Event<V, E>) {
        if event.is_terminal() {
            self.terminate(event);
            return;
        }
        if self.terminated.load(Ordering::Acquire) {
            POST_TERMINAL_SENDS_TOTAL.fetch_add(1, Ordering::Relaxed);
            warn!("value sent after terminal event; dropped");
            return;
        }
        let snapshot = self.snapshot.load_full();
        for slot in snapshot.iter() {
            slot.deliver(event.clone());
        }
    }

    fn terminate(&self, event: Event<V, E>) {
        let (slots, upstream) = {
            let Ok(mut registry) = self.registry.lock() else {
                return;
            };
            if self.terminated.swap(true, Ordering::AcqRel) {
                POST_TERMINAL_SENDS_TOTAL.fetch_add(1, Ordering::Relaxed);
                warn!("terminal event sent after terminal event; dropped");
                return;
            }
            self.snapshot.store(Arc::new(Vec::new()));
            (
                std::mem::take(&mut registry.slots),
                std::mem::take(&mut registry.upstream),
            )
        };
        trace!(observers = slots.len(), "signal terminated");
        for (_, slot) in &slots {
            slot.deliver(event.clone());
        }
        for subscription in &upstream {
            subscription.dispose();
        }
    }

    /// Record an upstream subscription this core is responsible for
    /// releasing. If the core has already terminated, release immediately.
    pub(crate) fn adopt_upstream(&self, subscription: Subscription) {
        {
            let Ok(mut registry) = self.registry.lock() else {
                subscription.dispose();
                return;
            };
            // Checked under the lock: `terminate` flips the flag under the
            // same lock, so a subscription pushed here is always taken by a
            // later terminate.
            if !self.terminated.load(Ordering::Acquire) {
                registry.upstream.push(subscription);
                return;
            }
        }
        subscription.dispose();
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.snapshot.load().len()
    }

    pub(crate) fn has_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

// ─── Signal ──────────────────────────────────────────────────────────────────

/// A one-directional, possibly-infinite sequence of events fanned out to
/// zero or more attached observers.
///
/// Cloning a `Signal` creates a new handle to the **same** core — clones
/// share observers and termination state.
pub struct Signal<V, E> {
    pub(crate) core: Arc<Core<V, E>>,
}

// Manual Clone: shares the same core, no bounds on V/E.
impl<V, E> Clone for Signal<V, E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<V, E> std::fmt::Debug for Signal<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("observer_count", &self.core.observer_count())
            .field("terminated", &self.core.has_terminated())
            .finish()
    }
}

impl<V, E> Signal<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a bound (signal, input observer) pair: a manual, hot signal.
    ///
    /// Feeding the returned [`Observer`] delivers the same events,
    /// synchronously and in attachment order, to every observer attached
    /// to the signal at the time of the send. Multiple writers may clone
    /// the input side; ordering across concurrent writers is the writers'
    /// responsibility.
    #[must_use]
    pub fn pipe() -> (Self, Observer<V, E>) {
        SIGNALS_CREATED_TOTAL.fetch_add(1, Ordering::Relaxed);
        let core = Core::new();
        let signal = Self {
            core: Arc::clone(&core),
        };
        (signal, Observer::new(core))
    }

    /// Attach a full observer receiving every event.
    ///
    /// Returns the attachment handle. Dropping the last clone of the
    /// handle (or disposing it) detaches the observer; call
    /// [`Subscription::detach`] to observe for the signal's lifetime.
    pub fn observe(&self, f: impl FnMut(Event<V, E>) + Send + 'static) -> Subscription {
        self.core.attach(Box::new(f))
    }

    /// Attach an observer invoked once per `Value` event.
    ///
    /// Terminal events release the attachment without invoking `f`.
    pub fn observe_next(&self, mut f: impl FnMut(V) + Send + 'static) -> Subscription {
        self.observe(move |event| {
            if let Event::Value(v) = event {
                f(v);
            }
        })
    }

    /// Attach an observer invoked at most once, with the first `Failed`
    /// event to reach it.
    pub fn observe_failed(&self, mut f: impl FnMut(E) + Send + 'static) -> Subscription {
        self.observe(move |event| {
            if let Event::Failed(e) = event {
                f(e);
            }
        })
    }

    /// Attach an observer invoked at most once, on `Completed`.
    pub fn observe_completed(&self, f: impl FnOnce() + Send + 'static) -> Subscription {
        let mut f = Some(f);
        self.observe(move |event| {
            if matches!(event, Event::Completed) {
                if let Some(f) = f.take() {
                    f();
                }
            }
        })
    }

    /// Attach an observer invoked at most once, on `Interrupted`.
    pub fn observe_interrupted(&self, f: impl FnOnce() + Send + 'static) -> Subscription {
        let mut f = Some(f);
        self.observe(move |event| {
            if matches!(event, Event::Interrupted) {
                if let Some(f) = f.take() {
                    f();
                }
            }
        })
    }

    /// Number of currently attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.core.observer_count()
    }

    /// Whether a terminal event has been delivered.
    #[must_use]
    pub fn has_terminated(&self) -> bool {
        self.core.has_terminated()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
