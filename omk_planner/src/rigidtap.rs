//! Rigid-tap substate machine.
//!
//! Tapping -> Reversing -> Retraction -> FinalReversal ->
//! FinalPlacement, gated on the signed spindle position. The XYZ line
//! is rebuilt in place at each reversal; the overrun allowance keeps
//! the profile alive while the spindle coasts to a stop past the
//! nominal reversal point.

use omk_common::consts::TAP_OVERRUN_REVS;
use omk_common::geom::CartLine;

use crate::segment::{SegGeom, Segment, SyncMode, TapState};

/// Advance the tap substate for one tick.
///
/// `signed_pos` is the encoder position signed by the spindle's
/// rotation sense; `spindle_offset` is the planner's current sync
/// offset. Returns `true` when the spindle speed command must flip
/// sign this tick.
pub fn handle_rigid_tap(tc: &mut Segment, signed_pos: f64, spindle_offset: f64) -> bool {
    let SegGeom::RigidTap(tap) = &mut tc.geom else {
        return false;
    };

    let mut flip = false;
    match tap.state {
        TapState::Tapping => {
            if tc.progress >= tap.reversal_target {
                // overshoot the nominal depth while the spindle winds
                // down; command the reversal now
                flip = true;
                tap.state = TapState::Reversing;
            }
        }
        TapState::Reversing => {
            if signed_pos < tap.prev_spindle_pos {
                // the spindle has stopped and started back: retrace
                // from wherever the overrun ended
                let here = tap.xyz.point_at(tc.progress);
                tap.spindlerevs_at_reversal = signed_pos + spindle_offset;
                tap.xyz = CartLine::new(here, tap.home);
                tap.reversal_target = tap.xyz.mag;
                tc.target = tap.xyz.mag + TAP_OVERRUN_REVS * tc.uu_per_rev;
                tc.progress = 0.0;
                tap.state = TapState::Retraction;
            }
        }
        TapState::Retraction => {
            if tc.progress >= tap.reversal_target {
                flip = true;
                tap.state = TapState::FinalReversal;
            }
        }
        TapState::FinalReversal => {
            if signed_pos > tap.prev_spindle_pos {
                // forward rotation restored: place the tool exactly at
                // the entry point, unsynchronised
                let here = tap.xyz.point_at(tc.progress);
                tap.xyz = CartLine::new(here, tap.home);
                tc.target = tap.xyz.mag;
                tc.progress = 0.0;
                tc.sync = SyncMode::None;
                tc.reqvel = tc.maxvel;
                tap.state = TapState::FinalPlacement;
            }
        }
        TapState::FinalPlacement => {}
    }
    tap.prev_spindle_pos = signed_pos;
    flip
}

// ─── Tests ──────────────────────────────────────────────────────────
