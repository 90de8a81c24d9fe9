#![forbid(unsafe_code)]

//! Core: push-based signals — the event algebra, observer fan-out,
//! pipe construction, disposal bookkeeping, and the operator layer.
//!
//! A [`Signal`] is a one-directional, possibly-infinite sequence of
//! [`Event`]s fanned out to attached observers. [`Signal::pipe`] yields a
//! bound (signal, [`Observer`]) pair for manual driving; operators
//! ([`Signal::map`], [`Signal::filter`], [`Signal::attempt_map`],
//! [`Signal::skip_until`], ...) derive new signals lazily. Attachments are
//! represented by [`Subscription`] handles with idempotent disposal.
//!
//! Delivery is synchronous, push-only, and thread-safe; see
//! [`signal`] for the engine's concurrency contract.

pub mod event;
pub mod logging;
pub mod observer;
mod ops;
pub mod signal;
pub mod subscription;

pub use event::Event;
pub use observer::Observer;
pub use signal::Signal;
pub use subscription::Subscription;
