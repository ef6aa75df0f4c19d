//! Look-ahead optimiser: backward reachable end-velocity pass.
//!
//! After every append and every blend splice, walk the queue backward
//! from the tail and raise each tangent predecessor's `finalvel` to the
//! highest velocity from which its successor can still reach the
//! successor's own end state. A rising tide only: the profiler enforces
//! per-tick deceleration feasibility, so no forward pass is needed.

use crate::queue::SegmentQueue;
use crate::segment::TermCond;

/// Run the backward pass over at most `depth` pairs from the tail.
pub fn run_optimizer(queue: &mut SegmentQueue, depth: usize) {
    let len = queue.len();
    if len < 2 {
        return;
    }

    let mut walked = 0;
    let mut i = len - 1;
    while i >= 1 && walked < depth {
        let Some(tc) = queue.item(i) else { break };
        let (tc_finalvel, tc_accel, tc_target, tc_maxvel, tc_atpeak) = (
            tc.finalvel,
            tc.scaled_accel(),
            tc.target,
            tc.maxvel,
            tc.atpeak,
        );

        let Some(prev) = queue.item_mut(i - 1) else { break };
        // A non-tangent handover resets the chain (finalvel stays 0),
        // and a segment the driver already started is off limits.
        if prev.term_cond != TermCond::Tangent || prev.progress > 0.0 {
            break;
        }

        let vs = (tc_finalvel * tc_finalvel + 2.0 * tc_accel * tc_target).sqrt();
        if vs >= tc_maxvel {
            prev.finalvel = tc_maxvel.min(prev.maxvel);
            prev.atpeak = true;
        } else {
            prev.finalvel = vs.min(prev.maxvel);
            prev.atpeak = false;
        }

        // The successor already carries the highest reachable end
        // velocity; nothing upstream can rise further.
        if tc_atpeak {
            break;
        }

        walked += 1;
        i -= 1;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
