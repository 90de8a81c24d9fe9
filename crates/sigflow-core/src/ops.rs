#![forbid(unsafe_code)]

//! Operator layer: derived signals that transform, drop, or gate events.
//!
//! # Design
//!
//! Every operator attaches to its upstream signal(s) at construction and
//! re-emits through a private pipe, so derived signals compose without
//! intermediate buffers. The derived core owns its upstream
//! subscription(s); the engine releases them exactly once, on termination
//! or when the last downstream observer detaches (see
//! [`crate::signal`]), so no subscription outlives anyone able to observe
//! its results.
//!
//! Transformation closures run synchronously on the delivering thread —
//! the thread the producer called `send` from.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use crate::event::Event;
use crate::signal::Signal;
use crate::subscription::Subscription;

// skip_until gate states.
const GATED: u8 = 0;
const PASSING: u8 = 1;

impl<V, E> Signal<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Transform every value with `f`, preserving order. Terminal events
    /// pass through unchanged.
    pub fn map<U>(&self, mut f: impl FnMut(V) -> U + Send + 'static) -> Signal<U, E>
    where
        U: Clone + Send + 'static,
    {
        let (signal, input) = Signal::pipe();
        let sub = self.observe(move |event| input.send(event.map(&mut f)));
        signal.core.adopt_upstream(sub);
        signal
    }

    /// Transform the failure channel with `f`. Values, `Completed`, and
    /// `Interrupted` pass through unchanged.
    pub fn map_failed<F>(&self, mut f: impl FnMut(E) -> F + Send + 'static) -> Signal<V, F>
    where
        F: Clone + Send + 'static,
    {
        let (signal, input) = Signal::pipe();
        let sub = self.observe(move |event| input.send(event.map_failed(&mut f)));
        signal.core.adopt_upstream(sub);
        signal
    }

    /// Forward only the values for which `predicate` returns true. Dropped
    /// values produce no observable effect; terminal events pass through.
    pub fn filter(&self, mut predicate: impl FnMut(&V) -> bool + Send + 'static) -> Signal<V, E> {
        let (signal, input) = Signal::pipe();
        let sub = self.observe(move |event| match event {
            Event::Value(v) => {
                if predicate(&v) {
                    input.send_value(v);
                }
            }
            terminal => input.send(terminal),
        });
        signal.core.adopt_upstream(sub);
        signal
    }

    /// Transform every value with a fallible `f`. The first `Err` becomes
    /// the derived signal's `Failed` terminal: nothing is forwarded after
    /// it, even if the upstream keeps producing, and the upstream
    /// attachment is released. Upstream terminals pass through unchanged
    /// when no failure has been synthesized.
    pub fn attempt_map<U>(
        &self,
        mut f: impl FnMut(V) -> Result<U, E> + Send + 'static,
    ) -> Signal<U, E>
    where
        U: Clone + Send + 'static,
    {
        let (signal, input) = Signal::pipe();
        let sub = self.observe(move |event| match event {
            Event::Value(v) => match f(v) {
                Ok(u) => input.send_value(u),
                // Terminates the derived signal; the engine then releases
                // this upstream attachment.
                Err(e) => input.send_failed(e),
            },
            Event::Failed(e) => input.send_failed(e),
            Event::Completed => input.send_completed(),
            Event::Interrupted => input.send_interrupted(),
        });
        signal.core.adopt_upstream(sub);
        signal
    }

    /// Suppress values from `self` until `trigger` first sends `Value` or
    /// `Completed`; from then on behave as an identity pass-through and
    /// release the trigger attachment.
    ///
    /// Termination is never suppressed: a terminal from `self` is
    /// forwarded even while gated. A `Failed` or `Interrupted` from
    /// `trigger` while gated terminates the derived signal with that
    /// event, so a dead trigger cannot leave the pipeline silently stuck.
    pub fn skip_until<T>(&self, trigger: &Signal<T, E>) -> Signal<V, E>
    where
        T: Clone + Send + 'static,
    {
        let (signal, input) = Signal::pipe();
        let state = Arc::new(AtomicU8::new(GATED));

        // The trigger callback releases its own subscription the moment the
        // gate opens; the handle reaches it through this cell.
        let gate_cell: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let trigger_state = Arc::clone(&state);
        let trigger_input = input.clone();
        let cell = Arc::clone(&gate_cell);
        let trigger_sub = trigger.observe(move |event| match event {
            Event::Value(_) | Event::Completed => {
                trigger_state.store(PASSING, Ordering::Release);
                if let Ok(mut slot) = cell.lock() {
                    if let Some(sub) = slot.take() {
                        sub.dispose();
                    }
                }
            }
            Event::Failed(e) => {
                if trigger_state.load(Ordering::Acquire) == GATED {
                    trigger_input.send_failed(e);
                }
            }
            Event::Interrupted => {
                if trigger_state.load(Ordering::Acquire) == GATED {
                    trigger_input.send_interrupted();
                }
            }
        });

        // Park the trigger subscription in the cell — unless the gate
        // already opened while we were attaching, in which case release it
        // right here.
        let release_now = match gate_cell.lock() {
            Ok(mut slot) => {
                if state.load(Ordering::Acquire) == GATED {
                    *slot = Some(trigger_sub.clone());
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        };
        if release_now {
            trigger_sub.dispose();
        }

        let source_state = Arc::clone(&state);
        let source_input = input.clone();
        let source_sub = self.observe(move |event| {
            // Terminals are never suppressed; values pass only once the
            // gate is open.
            if event.is_terminal() || source_state.load(Ordering::Acquire) == PASSING {
                source_input.send(event);
            }
        });

        signal.core.adopt_upstream(source_sub);
        signal.core.adopt_upstream(trigger_sub);
        signal
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
