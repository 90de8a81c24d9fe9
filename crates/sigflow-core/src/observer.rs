#![forbid(unsafe_code)]

//! The input side of a pipe: the capability that drives a signal.
//!
//! [`Observer<V, E>`] is the privileged sender half returned by
//! [`Signal::pipe`](crate::Signal::pipe). Feeding it an event fans that
//! event out, synchronously, to every observer attached to the paired
//! signal. It is cheaply cloneable; multiple writers are allowed, with
//! ordering across concurrent writers left to the writers themselves.
//!
//! Sending anything after a terminal event is a documented no-op: the
//! event is dropped, counted in
//! [`post_terminal_sends_total`](crate::signal::post_terminal_sends_total),
//! and never delivered. Racing producers therefore cannot violate the
//! terminal-exactly-once invariant, and a buggy producer cannot crash the
//! process.

use std::sync::Arc;

use crate::event::Event;
use crate::signal::Core;

/// Sender half of a [`Signal::pipe`](crate::Signal::pipe) pair.
///
/// Cloning an `Observer` creates another writer for the **same** signal.
pub struct Observer<V, E> {
    core: Arc<Core<V, E>>,
}

// Manual Clone: shares the same core, no bounds on V/E.
impl<V, E> Clone for Observer<V, E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<V, E> std::fmt::Debug for Observer<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("terminated", &self.core.has_terminated())
            .finish_non_exhaustive()
    }
}

impl<V, E> Observer<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn new(core: Arc<Core<V, E>>) -> Self {
        Self { core }
    }

    /// Deliver one event to every observer currently attached to the
    /// paired signal. Blocks until the whole fan-out has run.
    pub fn send(&self, event: Event<V, E>) {
        self.core.send(event);
    }

    /// Shorthand for `send(Event::Value(value))`.
    pub fn send_value(&self, value: V) {
        self.send(Event::Value(value));
    }

    /// Shorthand for `send(Event::Failed(failure))`. Terminal.
    pub fn send_failed(&self, failure: E) {
        self.send(Event::Failed(failure));
    }

    /// Shorthand for `send(Event::Completed)`. Terminal.
    pub fn send_completed(&self) {
        self.send(Event::Completed);
    }

    /// Shorthand for `send(Event::Interrupted)`. Terminal.
    pub fn send_interrupted(&self) {
        self.send(Event::Interrupted);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
