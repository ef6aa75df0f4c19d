//! One executable motion segment (TC): kind, geometry, kinematic
//! limits and runtime state.
//!
//! The profiler only ever looks at `(target, progress, currentvel,
//! limits)`; everything kind-specific is behind `point_at` and the
//! tangent queries.

use omk_common::geom::{Cart, CartLine, Circle, Pose};
use omk_common::io::SyncIoBatch;
use omk_common::status::{EnableFlags, MotionType};

// ─── Enums ──────────────────────────────────────────────────────────

/// How a segment hands over to its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermCond {
    /// Decelerate to rest before the next segment starts.
    Stop,
    /// Velocity-summation blend with the successor.
    Parabolic,
    /// Arclength carry-over into a tangent successor (C1 continuity).
    Tangent,
}

/// Spindle synchronisation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    None,
    /// Feed tracks spindle speed (feed-per-rev).
    Velocity,
    /// Progress is locked to encoder position (threading, tapping).
    Position,
}

/// Rigid-tap substate, gated on signed spindle revolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapState {
    Tapping,
    Reversing,
    Retraction,
    FinalReversal,
    FinalPlacement,
}

// ─── Geometry variants ──────────────────────────────────────────────

/// Linear move: XYZ, ABC and UVW sub-lines travelled in parallel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineGeom {
    pub xyz: CartLine,
    pub abc: CartLine,
    pub uvw: CartLine,
}

impl LineGeom {
    pub fn between(from: Pose, to: Pose) -> Self {
        Self {
            xyz: CartLine::new(from.xyz(), to.xyz()),
            abc: CartLine::new(from.abc(), to.abc()),
            uvw: CartLine::new(from.uvw(), to.uvw()),
        }
    }

    /// Dominant arclength: XYZ when non-zero, else UVW, else ABC.
    pub fn dominant_mag(&self) -> f64 {
        if !self.xyz.zero_mag {
            self.xyz.mag
        } else if !self.uvw.zero_mag {
            self.uvw.mag
        } else {
            self.abc.mag
        }
    }
}

/// Circular/helical move with ABC/UVW sub-lines in parallel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleGeom {
    pub xyz: Circle,
    pub abc: CartLine,
    pub uvw: CartLine,
}

/// Rigid-tap pass. The XYZ line is rebuilt in place at each spindle
/// reversal; `home` keeps the original entry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapGeom {
    pub xyz: CartLine,
    pub state: TapState,
    /// Progress at which the next spindle reversal is commanded.
    pub reversal_target: f64,
    /// Signed spindle position recorded at the first reversal.
    pub spindlerevs_at_reversal: f64,
    /// Signed spindle position seen on the previous tick.
    pub prev_spindle_pos: f64,
    /// Original entry point the retraction returns to.
    pub home: Cart,
    /// Constant rotary coordinates during the pass.
    pub abc: Cart,
    /// Constant auxiliary coordinates during the pass.
    pub uvw: Cart,
}

/// Kind-specific geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegGeom {
    Line(LineGeom),
    Circle(CircleGeom),
    RigidTap(TapGeom),
}

// ─── Segment ────────────────────────────────────────────────────────

/// One queued motion command with its runtime state.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: u32,
    pub geom: SegGeom,

    /// Total arclength.
    pub target: f64,
    /// Arclength travelled, 0..=target (tangent overshoot is rolled
    /// into the successor within the same tick).
    pub progress: f64,

    /// Feed-requested velocity before override scaling.
    pub reqvel: f64,
    /// Hard velocity cap; never above the sample-rate limit.
    pub maxvel: f64,
    /// Velocity allowed at `target` (non-zero only ahead of a tangent
    /// successor).
    pub finalvel: f64,
    pub currentvel: f64,

    pub maxaccel: f64,
    /// 1.0 plain, 0.5 during parabolic blends, 1/sqrt(2) for blend
    /// arcs.
    pub accel_scale: f64,

    pub term_cond: TermCond,
    /// Path tolerance for blending; 0 = unlimited.
    pub tolerance: f64,

    pub sync: SyncMode,
    /// User units per spindle revolution (synchronised modes).
    pub uu_per_rev: f64,
    /// Position-sync spin-up tick counter; 0 once latched.
    pub sync_accel: u32,

    /// Wait for the spindle to reach commanded speed before starting.
    pub atspeed: bool,
    pub active: bool,
    pub blending: bool,
    /// Look-ahead found this segment's end velocity pinned at its
    /// successor's cap.
    pub atpeak: bool,
    /// Velocity when the parabolic blend began.
    pub vel_at_blend_start: f64,

    /// Staged I/O applied once when this segment first becomes primary.
    pub syncdio: SyncIoBatch,
    /// Locking rotary axis to unlock before this segment runs.
    pub indexrotary: Option<u8>,

    /// Kind tag for status reporting.
    pub canon_kind: MotionType,
    pub enables: EnableFlags,
}

impl Segment {
    /// A fresh, inactive segment with neutral runtime state. Kinematic
    /// limits are filled in by the planner's construction preamble.
    pub fn new(id: u32, geom: SegGeom, target: f64) -> Self {
        Self {
            id,
            geom,
            target,
            progress: 0.0,
            reqvel: 0.0,
            maxvel: 0.0,
            finalvel: 0.0,
            currentvel: 0.0,
            maxaccel: 0.0,
            accel_scale: 1.0,
            term_cond: TermCond::Stop,
            tolerance: 0.0,
            sync: SyncMode::None,
            uu_per_rev: 0.0,
            sync_accel: 0,
            atspeed: false,
            active: false,
            blending: false,
            atpeak: false,
            vel_at_blend_start: 0.0,
            syncdio: SyncIoBatch::new(),
            indexrotary: None,
            canon_kind: MotionType::Feed,
            enables: EnableFlags::empty(),
        }
    }

    #[inline]
    pub fn is_synchronized(&self) -> bool {
        self.sync != SyncMode::None
    }

    #[inline]
    pub fn scaled_accel(&self) -> f64 {
        self.maxaccel * self.accel_scale
    }

    #[inline]
    pub fn distance_to_go(&self) -> f64 {
        self.target - self.progress
    }

    /// Rotary-only move (no XYZ or UVW translation). The tool-tip
    /// velocity limit does not apply to these.
    pub fn is_pure_rotary(&self) -> bool {
        match &self.geom {
            SegGeom::Line(g) => g.xyz.zero_mag && g.uvw.zero_mag && !g.abc.zero_mag,
            _ => false,
        }
    }

    #[inline]
    pub fn tap(&self) -> Option<&TapGeom> {
        match &self.geom {
            SegGeom::RigidTap(t) => Some(t),
            _ => None,
        }
    }

    /// Pose at the given arclength.
    ///
    /// The dominant coordinate travels by raw arclength; the parallel
    /// sub-lines advance proportionally. The rigid-tap line extrapolates
    /// past its nominal end during the overrun window.
    pub fn point_at(&self, progress: f64) -> Pose {
        let frac = if self.target > 0.0 {
            progress / self.target
        } else {
            1.0
        };
        match &self.geom {
            SegGeom::Line(g) => Pose::from_parts(
                g.xyz.point_at(frac * g.xyz.mag),
                g.abc.point_at(frac * g.abc.mag),
                g.uvw.point_at(frac * g.uvw.mag),
            ),
            SegGeom::Circle(g) => Pose::from_parts(
                g.xyz.point_at(frac * g.xyz.arclength()),
                g.abc.point_at(frac * g.abc.mag),
                g.uvw.point_at(frac * g.uvw.mag),
            ),
            SegGeom::RigidTap(g) => Pose::from_parts(g.xyz.point_at(progress), g.abc, g.uvw),
        }
    }

    /// Pose at the segment end.
    #[inline]
    pub fn end_point(&self) -> Pose {
        self.point_at(self.target)
    }

    /// Unit tangent of the XYZ path at the start, if defined.
    pub fn start_tangent(&self) -> Option<Cart> {
        match &self.geom {
            SegGeom::Line(g) => (!g.xyz.zero_mag).then_some(g.xyz.uvec),
            SegGeom::Circle(g) => g.xyz.tangent_at(0.0),
            SegGeom::RigidTap(g) => (!g.xyz.zero_mag).then_some(g.xyz.uvec),
        }
    }

    /// Unit tangent of the XYZ path at the end, if defined.
    pub fn end_tangent(&self) -> Option<Cart> {
        match &self.geom {
            SegGeom::Line(g) => (!g.xyz.zero_mag).then_some(g.xyz.uvec),
            SegGeom::Circle(g) => g.xyz.tangent_at(g.xyz.arclength()),
            SegGeom::RigidTap(g) => (!g.xyz.zero_mag).then_some(g.xyz.uvec),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
