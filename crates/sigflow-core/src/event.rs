#![forbid(unsafe_code)]

//! The event algebra: one unit of information flowing through a signal.
//!
//! # Design
//!
//! [`Event<V, E>`] is an immutable tagged value. A signal delivers zero or
//! more `Value` events in emission order, followed by at most one terminal
//! event (`Failed`, `Completed`, or `Interrupted`). `Interrupted` marks
//! teardown by disposal, not an application error; the two must never be
//! conflated.
//!
//! # Invariants
//!
//! 1. At most one terminal event is delivered per attachment lifetime.
//! 2. No event of any kind follows a terminal event on the same attachment.
//!
//! Both invariants are enforced by the signal engine (see
//! [`crate::signal`]), not by this type.

/// One unit of information flowing through a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<V, E> {
    /// A payload value. Zero or more per signal, in emission order.
    Value(V),
    /// Terminal: the producer failed. At most one per signal lifetime.
    Failed(E),
    /// Terminal: the producer finished normally.
    Completed,
    /// Terminal: the signal was torn down by disposal rather than by the
    /// producer.
    Interrupted,
}

impl<V, E> Event<V, E> {
    /// Whether this event carries a payload value.
    #[inline]
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Whether this event ends delivery on its attachment.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_value()
    }

    /// Extract the payload value, if any.
    #[must_use]
    pub fn value(self) -> Option<V> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Extract the failure payload, if any.
    #[must_use]
    pub fn failure(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Transform the value channel, passing terminal events through.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Event<U, E> {
        match self {
            Self::Value(v) => Event::Value(f(v)),
            Self::Failed(e) => Event::Failed(e),
            Self::Completed => Event::Completed,
            Self::Interrupted => Event::Interrupted,
        }
    }

    /// Transform the failure channel, passing everything else through.
    pub fn map_failed<F>(self, f: impl FnOnce(E) -> F) -> Event<V, F> {
        match self {
            Self::Value(v) => Event::Value(v),
            Self::Failed(e) => Event::Failed(f(e)),
            Self::Completed => Event::Completed,
            Self::Interrupted => Event::Interrupted,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
