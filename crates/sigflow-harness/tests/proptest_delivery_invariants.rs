//! Property-based invariant tests for the signal engine's delivery
//! contract.
//!
//! For **any** single-threaded op script, these must hold:
//!
//! 1. The real engine's per-observer logs equal the sequential reference
//!    model's.
//! 2. Each log contains at most one terminal event, and nothing after it.
//! 3. Observers attached at the same time see identical logs (fan-out is
//!    uniform and in attachment order).
//! 4. Scripts are deterministic: same ops, same logs.

#![forbid(unsafe_code)]

use proptest::prelude::*;
use sigflow_harness::script::{Op, check_invariants, reference_model, run_script};

// ── Strategies ──────────────────────────────────────────────────────────

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Attach),
        2 => (0usize..8).prop_map(Op::Detach),
        8 => (-100i32..100).prop_map(Op::SendValue),
        1 => any::<u8>().prop_map(Op::SendFailed),
        1 => Just(Op::SendCompleted),
        1 => Just(Op::SendInterrupted),
    ]
}

fn script() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(op(), 0..64)
}

/// Send-only ops: no attach/detach mixed in.
fn sends_only() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            8 => (-100i32..100).prop_map(Op::SendValue),
            1 => any::<u8>().prop_map(Op::SendFailed),
            1 => Just(Op::SendCompleted),
            1 => Just(Op::SendInterrupted),
        ],
        0..48,
    )
}

// ═════════════════════════════════════════════════════════════════════════
// Properties
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    /// 1. The engine agrees with the reference model on every script.
    #[test]
    fn engine_matches_reference_model(ops in script()) {
        let real = run_script(&ops);
        let expected = reference_model(&ops);
        prop_assert_eq!(real, expected);
    }

    /// 2. Terminal-exactly-once and nothing-after-terminal, per observer.
    #[test]
    fn terminal_invariants_hold(ops in script()) {
        let logs = run_script(&ops);
        if let Err(violation) = check_invariants(&logs) {
            prop_assert!(false, "{}", violation);
        }
    }

    /// 3. Two observers attached up front see the same sequence.
    #[test]
    fn coeval_observers_see_identical_logs(sends in sends_only()) {
        let mut ops = vec![Op::Attach, Op::Attach];
        ops.extend(sends);
        let logs = run_script(&ops);
        prop_assert_eq!(&logs[0], &logs[1]);
    }

    /// 4. Same script, same logs.
    #[test]
    fn scripts_are_deterministic(ops in script()) {
        prop_assert_eq!(run_script(&ops), run_script(&ops));
    }

    /// The reference model itself respects the delivery invariants — a
    /// guard against the oracle drifting from the contract.
    #[test]
    fn model_respects_invariants(ops in script()) {
        let logs = reference_model(&ops);
        if let Err(violation) = check_invariants(&logs) {
            prop_assert!(false, "model violated contract: {}", violation);
        }
    }
}
