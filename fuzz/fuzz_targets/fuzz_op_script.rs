#![no_main]

//! Structured fuzzing of the signal engine via op scripts: any sequence
//! of attach/detach/send operations must match the sequential reference
//! model and uphold the delivery invariants.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sigflow_harness::script::{Op, check_invariants, reference_model, run_script};

/// Arbitrary-derivable mirror of [`Op`] with a bounded detach index.
#[derive(Arbitrary, Debug)]
enum RawOp {
    Attach,
    Detach(u8),
    SendValue(i32),
    SendFailed(u8),
    SendCompleted,
    SendInterrupted,
}

impl From<&RawOp> for Op {
    fn from(raw: &RawOp) -> Self {
        match raw {
            RawOp::Attach => Op::Attach,
            RawOp::Detach(i) => Op::Detach(usize::from(*i) % 16),
            RawOp::SendValue(v) => Op::SendValue(*v),
            RawOp::SendFailed(e) => Op::SendFailed(*e),
            RawOp::SendCompleted => Op::SendCompleted,
            RawOp::SendInterrupted => Op::SendInterrupted,
        }
    }
}

fuzz_target!(|raw: Vec<RawOp>| {
    let ops: Vec<Op> = raw.iter().map(Op::from).collect();
    let logs = run_script(&ops);
    assert_eq!(logs, reference_model(&ops), "engine diverged from model");
    if let Err(violation) = check_invariants(&logs) {
        panic!("delivery invariant violated: {violation}");
    }
});
