//! Corner blending between consecutive linear moves.
//!
//! Two mechanisms live here:
//!
//! - [`parabolic_blend_velocity`]: the velocity at which a parabolic
//!   (velocity-summation) blend hands over, used by the cycle driver.
//! - [`handle_blend_arc`]: at enqueue time, optionally replace the
//!   corner between two XYZ lines with a tangent circular arc so the
//!   motion need not slow to the parabolic handover velocity. The arc
//!   respects the path tolerance, a radius bounded by the normal
//!   acceleration budget, and a minimum sweep imposed by the sample
//!   rate. Any degeneracy falls back to parabolic blending; the corner
//!   stays executable either way, so fallbacks are debug-logged and
//!   never surface as errors.

use core::f64::consts::PI;

use tracing::debug;

use omk_common::consts::{
    ARC_ACCEL_SPLIT, ARC_NORMAL_SAFETY, BLEND_RATIO, CRIT_ANGLE, EPS_ACCEL, EPS_MAG,
    SAMPLE_VEL_FACTOR,
};
use omk_common::geom::{CartLine, Circle};

use crate::queue::SegmentQueue;
use crate::segment::{CircleGeom, SegGeom, Segment, TermCond};

// ─── Parabolic blend velocity ───────────────────────────────────────

/// Velocity at which a parabolic blend between `tc` and `next` hands
/// over.
///
/// Bounded by what either segment can reach from rest over its own
/// length, by the successor's request, rebalanced when the successor
/// out-accelerates the current segment, and tightened by the path
/// tolerance at sharp corners.
pub fn parabolic_blend_velocity(tc: &Segment, next: &Segment) -> f64 {
    blend_velocity_from(
        tc.scaled_accel(),
        next.scaled_accel(),
        tc.target,
        next.target,
        next.reqvel,
        next.tolerance,
        half_supplement_cos(tc, next),
    )
}

fn half_supplement_cos(tc: &Segment, next: &Segment) -> f64 {
    match (tc.end_tangent(), next.start_tangent()) {
        (Some(t_out), Some(t_in)) => {
            let omega = t_out.dot(t_in).clamp(-1.0, 1.0).acos();
            (0.5 * (PI - omega)).cos()
        }
        _ => 1.0,
    }
}

fn blend_velocity_from(
    a_tc: f64,
    a_next: f64,
    tc_target: f64,
    next_target: f64,
    next_reqvel: f64,
    tolerance: f64,
    cos_theta: f64,
) -> f64 {
    if a_tc < EPS_ACCEL || a_next < EPS_ACCEL {
        return 0.0;
    }
    let mut v = (tc_target * a_tc).sqrt().min((next_target * a_next).sqrt());
    v = v.min(next_reqvel);
    if a_tc < a_next {
        v *= a_tc / a_next;
    }
    if tolerance > 0.0 && cos_theta > EPS_MAG {
        v = v.min(2.0 * (a_tc * tolerance / cos_theta).sqrt());
    }
    v.max(0.0)
}

// ─── Blend-arc builder ──────────────────────────────────────────────

/// Outcome of a blend-arc attempt at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendArcOutcome {
    /// Nothing changed; the corner blends parabolically as before.
    Fallback,
    /// The corner is already straight: the predecessor was promoted to
    /// tangent termination, no arc inserted.
    TangentPromoted,
    /// An arc segment was spliced in and the neighbours trimmed.
    Spliced {
        /// The trimmed predecessor collapsed to zero length and was
        /// dropped from the queue.
        popped_prev: bool,
    },
}

/// Snapshot of the predecessor fields the geometry pass needs, so the
/// queue borrow can be released between deciding and splicing.
#[derive(Debug, Clone, Copy)]
struct PrevView {
    xyz: CartLine,
    abc_zero: bool,
    uvw_zero: bool,
    progress: f64,
    term_cond: TermCond,
    target: f64,
    tolerance: f64,
    reqvel: f64,
    maxaccel: f64,
}

/// Try to replace the corner between the queue tail and the
/// not-yet-enqueued line `tc` with a tangent arc.
///
/// On `Spliced`, the predecessor has been trimmed (possibly popped),
/// the arc enqueued, and `tc` trimmed to start at the arc exit. The
/// caller still enqueues `tc` itself; `free >= 2` is checked up front
/// so that enqueue cannot fail.
pub fn handle_blend_arc(
    queue: &mut SegmentQueue,
    tc: &mut Segment,
    cycle_time: f64,
) -> BlendArcOutcome {
    if queue.free() < 2 {
        debug!("blend arc: queue too full to splice, falling back");
        return BlendArcOutcome::Fallback;
    }

    let Some(prev) = queue.last_mut() else {
        return BlendArcOutcome::Fallback;
    };

    // Both segments must be plain XYZ lines; the predecessor must be
    // parabolic and untouched by the cycle driver.
    let prev_view = match &prev.geom {
        SegGeom::Line(g) => PrevView {
            xyz: g.xyz,
            abc_zero: g.abc.zero_mag,
            uvw_zero: g.uvw.zero_mag,
            progress: prev.progress,
            term_cond: prev.term_cond,
            target: prev.target,
            tolerance: prev.tolerance,
            reqvel: prev.reqvel,
            maxaccel: prev.maxaccel,
        },
        _ => return BlendArcOutcome::Fallback,
    };
    let (tc_line, abc_pin, uvw_pin) = match &tc.geom {
        SegGeom::Line(g) if g.abc.zero_mag && g.uvw.zero_mag => {
            (g.xyz, g.abc.start, g.uvw.start)
        }
        _ => return BlendArcOutcome::Fallback,
    };
    if !prev_view.abc_zero
        || !prev_view.uvw_zero
        || prev_view.xyz.zero_mag
        || tc_line.zero_mag
        || prev_view.progress > 0.0
        || prev_view.term_cond != TermCond::Parabolic
    {
        return BlendArcOutcome::Fallback;
    }

    let omega = prev_view
        .xyz
        .uvec
        .dot(tc_line.uvec)
        .clamp(-1.0, 1.0)
        .acos();
    if omega < CRIT_ANGLE {
        // Straight continuation: no arc needed, C1 already holds.
        prev.term_cond = TermCond::Tangent;
        return BlendArcOutcome::TangentPromoted;
    }
    if omega > PI - CRIT_ANGLE {
        debug!(omega, "blend arc: near-reversal corner, falling back");
        return BlendArcOutcome::Fallback;
    }

    // Geometry: retreat distance and radius from the path tolerance.
    let theta = 0.5 * (PI - omega);
    let (sin_t, cos_t) = (theta.sin(), theta.cos());
    let tan_t = theta.tan();
    if 1.0 - sin_t < EPS_MAG {
        return BlendArcOutcome::Fallback;
    }

    let tolerance = match (prev_view.tolerance > 0.0, tc.tolerance > 0.0) {
        (true, true) => prev_view.tolerance.min(tc.tolerance),
        (true, false) => prev_view.tolerance,
        (false, true) => tc.tolerance,
        (false, false) => f64::INFINITY,
    };
    let d_tol = if tolerance.is_finite() {
        cos_t * tolerance / (1.0 - sin_t)
    } else {
        f64::INFINITY
    };
    let d_geom = prev_view
        .target
        .min(BLEND_RATIO * tc.target)
        .min(d_tol);
    let r_geom = tan_t * d_geom;

    // Kinematics: the arc gets 1/sqrt(2) of the tighter accel budget
    // for its normal direction, with a small safety margin.
    let a_max = prev_view.maxaccel.min(tc.maxaccel);
    let a_normal = a_max * ARC_ACCEL_SPLIT * ARC_NORMAL_SAFETY;
    if a_normal < EPS_ACCEL {
        return BlendArcOutcome::Fallback;
    }
    let v_normal = (a_normal * r_geom).sqrt();
    let mut v_upper = prev_view.reqvel.max(tc.reqvel).min(v_normal);
    let r_normal = v_upper * v_upper / a_normal;
    let mut r_upper = r_geom.min(r_normal);
    let mut d_upper = r_upper / tan_t;
    let phi = PI - 2.0 * theta;

    // Sample-rate guard: the arc must span at least one servo tick.
    let v_sample = phi * d_upper * tan_t / cycle_time;
    if v_upper > v_sample {
        v_upper = v_sample;
        r_upper = (v_upper * v_upper / a_normal).min(r_geom);
        d_upper = r_upper / tan_t;
        // If the surviving predecessor can no longer cruise at the arc
        // entry speed, shrink the retreat until it can.
        let l1 = prev_view.target;
        if (l1 - d_upper) / cycle_time < v_upper {
            d_upper = l1 / (1.0 + phi * tan_t);
            v_upper = (l1 - d_upper) / cycle_time;
            r_upper = d_upper * tan_t;
        }
    }

    // Quality gate: only splice when the arc beats the parabolic blend.
    let v_parabolic = blend_velocity_from(
        0.5 * prev_view.maxaccel,
        0.5 * tc.maxaccel,
        prev_view.target,
        tc.target,
        tc.reqvel,
        tc.tolerance,
        cos_t,
    );
    if r_upper < EPS_MAG {
        debug!("blend arc: radius collapsed, falling back");
        return BlendArcOutcome::Fallback;
    }
    if v_upper <= v_parabolic {
        debug!(v_upper, v_parabolic, "blend arc: no gain over parabolic blend");
        return BlendArcOutcome::Fallback;
    }
    if prev_view.target - d_upper < -EPS_MAG {
        debug!("blend arc: predecessor remnant negative, falling back");
        return BlendArcOutcome::Fallback;
    }

    // Splice: fit the arc, trim both neighbours, re-run the caps.
    let corner = prev_view.xyz.end;
    let arc_start = prev_view.xyz.point_at(prev_view.target - d_upper);
    let arc_end = tc_line.point_at(d_upper);
    let Some(circle) = Circle::from_blend(arc_start, corner, arc_end, r_upper) else {
        debug!("blend arc: degenerate three-point fit, falling back");
        return BlendArcOutcome::Fallback;
    };
    let arc_target = circle.arclength();
    if arc_target < EPS_MAG {
        debug!("blend arc: zero-length arc, falling back");
        return BlendArcOutcome::Fallback;
    }

    let mut arc = Segment::new(
        prev.id,
        SegGeom::Circle(CircleGeom {
            xyz: circle,
            abc: CartLine::pinned(abc_pin),
            uvw: CartLine::pinned(uvw_pin),
        }),
        arc_target,
    );
    // The corner-speed bound IS the arc's velocity cap: the look-ahead
    // pass must not promise entry velocities the arc cannot carry.
    arc.maxvel = v_upper.min(SAMPLE_VEL_FACTOR * arc_target / cycle_time);
    arc.reqvel = arc.maxvel;
    arc.maxaccel = a_max;
    arc.accel_scale = ARC_ACCEL_SPLIT;
    arc.term_cond = TermCond::Tangent;
    arc.tolerance = 0.0;
    arc.sync = prev.sync;
    arc.uu_per_rev = prev.uu_per_rev;
    arc.atspeed = prev.atspeed;
    arc.enables = prev.enables;
    arc.canon_kind = prev.canon_kind;

    // Trim the predecessor back to the arc entry.
    let new_prev_line = CartLine::new(prev_view.xyz.start, arc_start);
    if let SegGeom::Line(g) = &mut prev.geom {
        g.xyz = new_prev_line;
    }
    prev.target = new_prev_line.mag;
    prev.term_cond = TermCond::Tangent;
    prev.maxvel = prev.maxvel.min(SAMPLE_VEL_FACTOR * prev.target / cycle_time);

    let popped_prev = prev.target < EPS_MAG;
    if popped_prev {
        queue.pop_back();
    }

    // Trim the successor forward to the arc exit.
    let new_tc_line = CartLine::new(arc_end, tc_line.end);
    if let SegGeom::Line(g) = &mut tc.geom {
        g.xyz = new_tc_line;
    }
    tc.target = new_tc_line.mag;
    tc.maxvel = tc.maxvel.min(SAMPLE_VEL_FACTOR * tc.target / cycle_time);

    // free >= 2 was checked above, so this cannot fail.
    let _ = queue.put(arc);

    BlendArcOutcome::Spliced { popped_prev }
}

// ─── Tests ──────────────────────────────────────────────────────────
