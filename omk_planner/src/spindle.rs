//! Spindle synchronisation controllers.
//!
//! Velocity mode simply feeds per revolution; position mode locks
//! segment progress to the encoder, with a spin-up phase that latches
//! the sync offset once the axis has caught up to the spindle.

use crate::segment::{SegGeom, Segment, TapState};

/// Planner-side spindle tracking state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpindleTracker {
    /// Effective spindle position used by position sync [rev].
    pub revs: f64,
    /// Offset between encoder revs and segment progress [rev].
    pub offset: f64,
}

impl SpindleTracker {
    pub fn reset(&mut self) {
        self.revs = 0.0;
        self.offset = 0.0;
    }
}

/// Velocity-mode sync: feed per revolution against the commanded
/// spindle speed, compensated for progress a blending successor has
/// already consumed.
pub fn sync_velocity_mode(tc: &mut Segment, next_progress: Option<f64>, speed_in_rps: f64) {
    let mut reqvel = speed_in_rps.abs() * tc.uu_per_rev;
    if let Some(p) = next_progress {
        reqvel -= p;
    }
    tc.reqvel = reqvel.max(0.0);
}

/// Position-mode sync: track the encoder exactly.
///
/// While `sync_accel` is counting, the axis accelerates flat out until
/// its velocity matches the spindle's; at that instant the offset is
/// latched so the position error is driven to zero on the next cycle.
/// In steady state the request is the spindle velocity plus an error
/// recovery term bounded by the segment's acceleration.
pub fn sync_position_mode(
    tc: &mut Segment,
    next_progress: Option<f64>,
    spindle: &mut SpindleTracker,
    signed_pos: f64,
    cycle_time: f64,
) {
    let oldrevs = spindle.revs;

    // Retraction phases of a rigid tap run against the position
    // recorded at the reversal, counting back toward the entry.
    spindle.revs = match &tc.geom {
        SegGeom::RigidTap(tap)
            if matches!(tap.state, TapState::Retraction | TapState::FinalReversal) =>
        {
            tap.spindlerevs_at_reversal - signed_pos
        }
        _ => signed_pos,
    };

    let mut pos_error = (spindle.revs - spindle.offset) * tc.uu_per_rev - tc.progress;
    if let Some(p) = next_progress {
        pos_error -= p;
    }

    if tc.sync_accel > 0 {
        // spin-up: chase the spindle, latch once caught up
        let spindle_vel = spindle.revs / (cycle_time * tc.sync_accel as f64);
        tc.sync_accel += 1;
        let target_vel = spindle_vel * tc.uu_per_rev;
        if tc.currentvel >= target_vel {
            spindle.offset = spindle.revs - tc.progress / tc.uu_per_rev;
            tc.sync_accel = 0;
            tc.reqvel = target_vel;
        } else {
            tc.reqvel = tc.maxvel;
        }
    } else {
        let spindle_vel = (spindle.revs - oldrevs) / cycle_time;
        let target_vel = spindle_vel * tc.uu_per_rev;
        let mut errorvel = (pos_error.abs() * tc.scaled_accel()).sqrt();
        if pos_error < 0.0 {
            errorvel = -errorvel;
        }
        tc.reqvel = target_vel + errorvel;
    }

    if tc.reqvel < 0.0 {
        tc.reqvel = 0.0;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
