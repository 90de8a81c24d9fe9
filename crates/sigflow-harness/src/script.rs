#![forbid(unsafe_code)]

//! Deterministic op scripts and the sequential reference model.
//!
//! A script is a flat list of [`Op`]s applied in order, on one thread, to
//! a single `pipe()` pair. [`run_script`] executes it against the real
//! engine and returns one delivery log per attachment, in attachment
//! order; [`reference_model`] computes the logs the delivery contract
//! promises. For any script the two must agree — that equivalence is the
//! backbone of the property tests and the fuzz target.

use std::sync::{Arc, Mutex};

use sigflow_core::{Event, Signal, Subscription};

/// Event instantiation used by scripts: small copyable payloads.
pub type TestEvent = Event<i32, u8>;

/// One scripted step against a signal pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Attach a fresh recording observer.
    Attach,
    /// Dispose the n-th attachment made so far (no-op if out of range or
    /// already disposed).
    Detach(usize),
    /// Send `Value(v)` through the input side.
    SendValue(i32),
    /// Send `Failed(e)` through the input side. Terminal.
    SendFailed(u8),
    /// Send `Completed`. Terminal.
    SendCompleted,
    /// Send `Interrupted`. Terminal.
    SendInterrupted,
}

impl Op {
    fn event(&self) -> Option<TestEvent> {
        match self {
            Op::SendValue(v) => Some(Event::Value(*v)),
            Op::SendFailed(e) => Some(Event::Failed(*e)),
            Op::SendCompleted => Some(Event::Completed),
            Op::SendInterrupted => Some(Event::Interrupted),
            Op::Attach | Op::Detach(_) => None,
        }
    }
}

/// Run a script against the real engine. Returns one delivery log per
/// `Attach`, in attachment order.
pub fn run_script(ops: &[Op]) -> Vec<Vec<TestEvent>> {
    let (signal, input) = Signal::<i32, u8>::pipe();
    let mut subscriptions: Vec<Subscription> = Vec::new();
    let mut logs: Vec<Arc<Mutex<Vec<TestEvent>>>> = Vec::new();

    for op in ops {
        match op {
            Op::Attach => {
                let log = Arc::new(Mutex::new(Vec::new()));
                let log_clone = Arc::clone(&log);
                subscriptions.push(signal.observe(move |event| {
                    log_clone.lock().expect("log poisoned").push(event);
                }));
                logs.push(log);
            }
            Op::Detach(i) => {
                if let Some(subscription) = subscriptions.get(*i) {
                    subscription.dispose();
                }
            }
            send => {
                if let Some(event) = send.event() {
                    input.send(event);
                }
            }
        }
    }

    logs.iter()
        .map(|log| log.lock().expect("log poisoned").clone())
        .collect()
}

/// Sequential model of the delivery contract: attachment-order fan-out,
/// terminal-exactly-once, no replay for late attachers, idempotent detach.
pub fn reference_model(ops: &[Op]) -> Vec<Vec<TestEvent>> {
    struct ModelObserver {
        log: Vec<TestEvent>,
        attached: bool,
    }

    let mut observers: Vec<ModelObserver> = Vec::new();
    let mut terminated = false;

    for op in ops {
        match op {
            Op::Attach => observers.push(ModelObserver {
                log: Vec::new(),
                // No replay: attaching after the terminal sees nothing.
                attached: !terminated,
            }),
            Op::Detach(i) => {
                if let Some(observer) = observers.get_mut(*i) {
                    observer.attached = false;
                }
            }
            send => {
                let Some(event) = send.event() else { continue };
                if terminated {
                    // Post-terminal sends are dropped by the engine.
                    continue;
                }
                let terminal = event.is_terminal();
                for observer in observers.iter_mut().filter(|o| o.attached) {
                    observer.log.push(event.clone());
                    if terminal {
                        observer.attached = false;
                    }
                }
                if terminal {
                    terminated = true;
                }
            }
        }
    }

    observers.into_iter().map(|o| o.log).collect()
}

/// Check the engine-wide delivery invariants on a set of logs:
/// at most one terminal per log, and nothing after it.
///
/// Returns the first violation as a human-readable message.
pub fn check_invariants(logs: &[Vec<TestEvent>]) -> Result<(), String> {
    for (i, log) in logs.iter().enumerate() {
        let terminal_count = log.iter().filter(|e| e.is_terminal()).count();
        if terminal_count > 1 {
            return Err(format!(
                "observer {i} received {terminal_count} terminal events: {log:?}"
            ));
        }
        if let Some(pos) = log.iter().position(|e| e.is_terminal()) {
            if pos != log.len() - 1 {
                return Err(format!(
                    "observer {i} received events after its terminal: {log:?}"
                ));
            }
        }
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_matches_engine_on_simple_fanout() {
        let ops = vec![
            Op::Attach,
            Op::Attach,
            Op::SendValue(1),
            Op::SendValue(2),
            Op::SendCompleted,
        ];
        let real = run_script(&ops);
        let expected = reference_model(&ops);
        assert_eq!(real, expected);
        assert_eq!(real.len(), 2);
        assert_eq!(
            real[0],
            vec![Event::Value(1), Event::Value(2), Event::Completed]
        );
    }

    #[test]
    fn model_matches_engine_with_detach() {
        let ops = vec![
            Op::Attach,
            Op::SendValue(1),
            Op::Detach(0),
            Op::SendValue(2),
            Op::Attach,
            Op::SendValue(3),
        ];
        let real = run_script(&ops);
        let expected = reference_model(&ops);
        assert_eq!(real, expected);
        assert_eq!(real[0], vec![Event::Value(1)]);
        assert_eq!(real[1], vec![Event::Value(3)]);
    }

    #[test]
    fn model_matches_engine_on_late_attach() {
        let ops = vec![Op::Attach, Op::SendFailed(9), Op::Attach, Op::SendValue(1)];
        let real = run_script(&ops);
        let expected = reference_model(&ops);
        assert_eq!(real, expected);
        assert_eq!(real[0], vec![Event::Failed(9)]);
        assert!(real[1].is_empty());
    }

    #[test]
    fn detach_out_of_range_is_noop() {
        let ops = vec![Op::Detach(3), Op::Attach, Op::SendValue(1)];
        let real = run_script(&ops);
        let expected = reference_model(&ops);
        assert_eq!(real, expected);
    }

    #[test]
    fn check_invariants_flags_event_after_terminal() {
        let bad = vec![vec![Event::Completed, Event::Value(1)]];
        assert!(check_invariants(&bad).is_err());
    }

    #[test]
    fn check_invariants_flags_double_terminal() {
        let bad = vec![vec![Event::Completed, Event::Interrupted]];
        assert!(check_invariants(&bad).is_err());
    }

    #[test]
    fn check_invariants_accepts_clean_logs() {
        let good = vec![vec![Event::Value(1), Event::Completed], vec![]];
        assert!(check_invariants(&good).is_ok());
    }
}
