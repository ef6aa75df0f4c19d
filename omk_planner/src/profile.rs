//! Per-tick trapezoidal velocity profile with a final-velocity term.
//!
//! Each tick solves for the highest velocity from which the segment can
//! still decelerate to `finalvel` exactly at `target`, clamps it by the
//! request, the tool-tip limit and the acceleration budget, then
//! integrates. Termination at non-zero velocity is what makes tangent
//! chains run without dips; overshoot recovery is local and never an
//! error.

use omk_common::consts::{EPS_ACCEL, FINAL_DECEL_TOL};

use crate::segment::{Segment, SyncMode, TermCond};

/// Per-tick profiler inputs owned by the planner.
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    /// Servo period [s].
    pub cycle_time: f64,
    /// Tool-tip velocity limit (translation moves only).
    pub vlimit: f64,
    /// Net feed override for this segment (0 while pausing/aborting).
    pub feed_override: f64,
    /// Pausing forces the final velocity to zero so the profile
    /// decelerates to rest in place.
    pub pausing: bool,
}

/// Per-tick profiler outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickOutcome {
    /// The unclamped profile solution was within tolerance of the
    /// applied velocity: the segment is on its final deceleration ramp.
    pub on_final_decel: bool,
}

/// Advance `tc` by one servo tick.
pub fn tc_run_cycle(tc: &mut Segment, ctx: &TickContext) -> TickOutcome {
    let dt = ctx.cycle_time;
    let accel = tc.scaled_accel();
    if dt <= 0.0 || accel < EPS_ACCEL {
        return TickOutcome::default();
    }

    let req_vel = (tc.reqvel * ctx.feed_override).min(tc.maxvel);
    let final_vel = if ctx.pausing {
        0.0
    } else {
        (tc.finalvel * ctx.feed_override).min(req_vel)
    };

    if !tc.blending {
        tc.vel_at_blend_start = tc.currentvel;
    }

    // Highest velocity from which deceleration at `accel` still reaches
    // `target` at exactly `final_vel`.
    let delta = tc.target - tc.progress;
    let half_step = 0.5 * accel * dt;
    let disc = final_vel * final_vel
        + accel * (2.0 * delta - tc.currentvel * dt)
        + half_step * half_step;

    let (mut newvel, overshot) = if disc < 0.0 {
        (0.0, true)
    } else {
        (-half_step + disc.sqrt(), false)
    };
    let maxnewvel = newvel;

    if newvel > req_vel {
        newvel = req_vel;
    }
    if newvel < 0.0 || overshot {
        // The profile demands a reversal: the target falls inside this
        // tick. Tangent segments keep their overshoot (the successor
        // absorbs it); everything else snaps exactly onto the target.
        newvel = 0.0;
        if tc.term_cond != TermCond::Tangent {
            tc.progress = tc.target;
            tc.currentvel = 0.0;
            return TickOutcome {
                on_final_decel: maxnewvel.abs() < FINAL_DECEL_TOL,
            };
        }
    }

    // Tool-tip cap; rotary-only and position-synced moves are exempt.
    if !tc.is_pure_rotary() && tc.sync != SyncMode::Position {
        newvel = newvel.min(ctx.vlimit);
    }

    // Saturate acceleration, then integrate trapezoidally.
    let accel_req = ((newvel - tc.currentvel) / dt).clamp(-accel, accel);
    newvel = tc.currentvel + accel_req * dt;

    tc.progress += 0.5 * (newvel + tc.currentvel) * dt;
    tc.currentvel = newvel;

    TickOutcome {
        on_final_decel: (maxnewvel - newvel).abs() < FINAL_DECEL_TOL,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
