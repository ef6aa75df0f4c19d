//! Trajectory planner handle and producer-side API.
//!
//! The non-real-time producer builds motion through `add_line` /
//! `add_circle` / `add_rigid_tap` and the control operations here; the
//! real-time side consumes the queue one tick at a time through
//! [`TrajPlanner::run_cycle`] (see `cycle`). Construction is the only
//! allocation: the queue arena is sized once and everything afterwards
//! runs in place.

use omk_common::consts::{CYCLE_TIME_US_DEFAULT, EPS_MAG, INVALID_MOTION_ID, SAMPLE_VEL_FACTOR};
use omk_common::geom::{CartLine, Circle, Cart, Pose};
use omk_common::io::SyncIoBatch;
use omk_common::status::{EnableFlags, MotionType};

use crate::blend::handle_blend_arc;
use crate::config::PlannerConfig;
use crate::error::{TpError, TpResult};
use crate::lookahead::run_optimizer;
use crate::queue::SegmentQueue;
use crate::segment::{
    LineGeom, CircleGeom, SegGeom, Segment, SyncMode, TapGeom, TapState, TermCond,
};
use crate::spindle::SpindleTracker;

/// The trajectory planner.
///
/// Owns the segment queue, the commanded pose pair, the global
/// kinematic bounds and the spindle/override state shared between the
/// producer API and the per-tick cycle driver.
#[derive(Debug)]
pub struct TrajPlanner {
    pub(crate) queue: SegmentQueue,

    pub(crate) cycle_time: f64,
    pub(crate) vmax: f64,
    pub(crate) ini_maxvel: f64,
    pub(crate) vlimit: f64,
    pub(crate) amax: f64,

    /// Pose the consumer has reached.
    pub(crate) current_pos: Pose,
    /// End of the most recently appended segment.
    pub(crate) goal_pos: Pose,

    pub(crate) next_id: u32,
    pub(crate) exec_id: u32,
    pub(crate) motion_type: MotionType,

    /// Termination/tolerance defaults stamped onto new segments.
    pub(crate) term_cond: TermCond,
    pub(crate) tolerance: f64,

    pub(crate) done: bool,
    pub(crate) pausing: bool,
    pub(crate) aborting: bool,

    /// Feed-per-rev setting for new segments; 0 disables sync.
    pub(crate) sync_uu_per_rev: f64,
    pub(crate) sync_velocity_mode: bool,

    pub(crate) spindle: SpindleTracker,
    pub(crate) waiting_for_index: Option<u32>,
    pub(crate) waiting_for_atspeed: Option<u32>,
    /// Encoder index latch request line (cleared by hardware).
    pub(crate) index_enable_req: bool,
    /// Progress is currently locked to the encoder.
    pub(crate) spindle_sync_active: bool,
    /// Commanded spindle speed mirror; rigid tapping flips its sign.
    pub(crate) spindle_speed_out: f64,

    /// Net feed override, refreshed from feedback each tick.
    pub(crate) feed_scale: f64,

    /// Producer-side staging area, snapshotted into the next segment.
    pub(crate) syncdio: SyncIoBatch,
    /// Enables from the most recent Add, reported while idle.
    pub(crate) enables_latest: EnableFlags,

    pub(crate) active_depth: u32,
    pub(crate) lookahead_depth: usize,
    pub(crate) enable_blend_arcs: bool,
}

impl TrajPlanner {
    /// Create a planner with a queue arena of `queue_size` slots and
    /// default kinematics.
    pub fn new(queue_size: usize) -> TpResult<Self> {
        if queue_size == 0 {
            return Err(TpError::InvalidArgument("queue_size must be positive"));
        }
        let cfg = PlannerConfig::default();
        Ok(Self {
            queue: SegmentQueue::with_capacity(queue_size),
            cycle_time: CYCLE_TIME_US_DEFAULT as f64 * 1e-6,
            vmax: cfg.vmax,
            ini_maxvel: cfg.ini_maxvel,
            vlimit: cfg.vlimit,
            amax: cfg.amax,
            current_pos: Pose::ZERO,
            goal_pos: Pose::ZERO,
            next_id: 1,
            exec_id: INVALID_MOTION_ID,
            motion_type: MotionType::None,
            term_cond: TermCond::Parabolic,
            tolerance: 0.0,
            done: true,
            pausing: false,
            aborting: false,
            sync_uu_per_rev: 0.0,
            sync_velocity_mode: false,
            spindle: SpindleTracker::default(),
            waiting_for_index: None,
            waiting_for_atspeed: None,
            index_enable_req: false,
            spindle_sync_active: false,
            spindle_speed_out: 0.0,
            feed_scale: 1.0,
            syncdio: SyncIoBatch::new(),
            enables_latest: EnableFlags::empty(),
            active_depth: 0,
            lookahead_depth: cfg.lookahead_depth,
            enable_blend_arcs: cfg.enable_blend_arcs,
        })
    }

    /// Create a planner from a validated configuration.
    pub fn from_config(cfg: &PlannerConfig) -> TpResult<Self> {
        let mut tp = Self::new(cfg.queue_size)?;
        tp.set_cycle_time(cfg.cycle_time())?;
        tp.set_vmax(cfg.vmax, cfg.ini_maxvel)?;
        tp.set_vlimit(cfg.vlimit)?;
        tp.set_amax(cfg.amax)?;
        tp.lookahead_depth = cfg.lookahead_depth;
        tp.enable_blend_arcs = cfg.enable_blend_arcs;
        Ok(tp)
    }

    // ─── Control operations ─────────────────────────────────────────

    /// Soft re-initialisation: runtime state is reset, the configured
    /// cycle time and kinematic bounds are kept.
    pub fn init(&mut self) {
        self.current_pos = Pose::ZERO;
        self.goal_pos = Pose::ZERO;
        self.next_id = 1;
        self.term_cond = TermCond::Parabolic;
        self.tolerance = 0.0;
        self.sync_uu_per_rev = 0.0;
        self.sync_velocity_mode = false;
        self.feed_scale = 1.0;
        self.enables_latest = EnableFlags::empty();
        self.clear();
    }

    /// Drop all queued motion and derived runtime state. The current
    /// pose is kept and becomes the goal.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.goal_pos = self.current_pos;
        self.done = true;
        self.pausing = false;
        self.aborting = false;
        self.exec_id = INVALID_MOTION_ID;
        self.motion_type = MotionType::None;
        self.spindle.reset();
        self.waiting_for_index = None;
        self.waiting_for_atspeed = None;
        self.index_enable_req = false;
        self.spindle_sync_active = false;
        self.syncdio.clear();
        self.active_depth = 0;
    }

    pub fn set_cycle_time(&mut self, seconds: f64) -> TpResult<()> {
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(TpError::InvalidArgument("cycle time must be positive"));
        }
        self.cycle_time = seconds;
        Ok(())
    }

    pub fn set_vmax(&mut self, vmax: f64, ini_maxvel: f64) -> TpResult<()> {
        if !(vmax.is_finite() && vmax > 0.0 && ini_maxvel.is_finite() && ini_maxvel > 0.0) {
            return Err(TpError::InvalidArgument("vmax must be positive"));
        }
        self.vmax = vmax;
        self.ini_maxvel = ini_maxvel;
        Ok(())
    }

    pub fn set_vlimit(&mut self, vlimit: f64) -> TpResult<()> {
        if !(vlimit.is_finite() && vlimit >= 0.0) {
            return Err(TpError::InvalidArgument("vlimit must be non-negative"));
        }
        self.vlimit = vlimit;
        Ok(())
    }

    pub fn set_amax(&mut self, amax: f64) -> TpResult<()> {
        if !(amax.is_finite() && amax > 0.0) {
            return Err(TpError::InvalidArgument("amax must be positive"));
        }
        self.amax = amax;
        Ok(())
    }

    /// Set the id the next appended segment receives.
    pub fn set_id(&mut self, id: u32) -> TpResult<()> {
        if id == INVALID_MOTION_ID {
            return Err(TpError::InvalidMotionId(id));
        }
        self.next_id = id;
        Ok(())
    }

    /// Termination condition and blend tolerance for segments appended
    /// from now on.
    pub fn set_term_cond(&mut self, cond: TermCond, tolerance: f64) -> TpResult<()> {
        if !(tolerance.is_finite() && tolerance >= 0.0) {
            return Err(TpError::InvalidArgument("tolerance must be non-negative"));
        }
        self.term_cond = cond;
        self.tolerance = tolerance;
        Ok(())
    }

    /// Teleport the commanded position (machine off / homing only).
    pub fn set_pos(&mut self, pos: Pose) {
        self.current_pos = pos;
        self.goal_pos = pos;
    }

    /// Configure spindle synchronisation for segments appended from now
    /// on. `uu_per_rev == 0` turns sync off.
    pub fn set_spindle_sync(&mut self, uu_per_rev: f64, velocity_mode: bool) -> TpResult<()> {
        if !(uu_per_rev.is_finite() && uu_per_rev >= 0.0) {
            return Err(TpError::InvalidArgument("uu_per_rev must be non-negative"));
        }
        self.sync_uu_per_rev = uu_per_rev;
        self.sync_velocity_mode = velocity_mode;
        Ok(())
    }

    /// Stage a digital output edge for the next appended segment.
    pub fn set_dout(&mut self, index: u8, start: bool, end: bool) -> TpResult<()> {
        self.syncdio
            .stage_dout(index, start, end)
            .map_err(|_| TpError::SyncIoOverflow)
    }

    /// Stage an analog output edge for the next appended segment.
    pub fn set_aout(&mut self, index: u8, start: f64, end: f64) -> TpResult<()> {
        self.syncdio
            .stage_aout(index, start, end)
            .map_err(|_| TpError::SyncIoOverflow)
    }

    /// Decelerate to rest in place; the queue is kept.
    pub fn pause(&mut self) {
        self.pausing = true;
    }

    /// Resume from a pause.
    pub fn resume(&mut self) {
        self.pausing = false;
    }

    /// Drain velocity to zero, then discard all queued motion. Level
    /// triggered: Add* calls fail until the drain completes.
    pub fn abort(&mut self) {
        self.aborting = true;
        self.pausing = true;
    }

    // ─── Queries ────────────────────────────────────────────────────

    #[inline]
    pub fn exec_id(&self) -> u32 {
        self.exec_id
    }

    #[inline]
    pub fn pos(&self) -> Pose {
        self.current_pos
    }

    #[inline]
    pub fn goal(&self) -> Pose {
        self.goal_pos
    }

    #[inline]
    pub fn motion_type(&self) -> MotionType {
        self.motion_type
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[inline]
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn active_depth(&self) -> u32 {
        self.active_depth
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.pausing
    }

    #[inline]
    pub fn cycle_time(&self) -> f64 {
        self.cycle_time
    }

    #[inline]
    pub fn vmax(&self) -> f64 {
        self.vmax
    }

    #[inline]
    pub fn amax(&self) -> f64 {
        self.amax
    }

    #[inline]
    pub fn vlimit(&self) -> f64 {
        self.vlimit
    }

    #[inline]
    pub fn is_aborting(&self) -> bool {
        self.aborting
    }

    // ─── Segment construction ───────────────────────────────────────

    /// Append a straight move ending at `end`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_line(
        &mut self,
        end: Pose,
        canon_kind: MotionType,
        vel: f64,
        ini_maxvel: f64,
        acc: f64,
        enables: EnableFlags,
        atspeed: bool,
        indexrotary: Option<u8>,
    ) -> TpResult<()> {
        self.check_add(vel, ini_maxvel, acc)?;

        let geom = LineGeom::between(self.goal_pos, end);
        let target = geom.dominant_mag();
        if target < EPS_MAG {
            return Err(TpError::InvalidArgument("zero-length line"));
        }

        let mut tc = self.new_segment(SegGeom::Line(geom), target, canon_kind, vel, ini_maxvel, acc);
        tc.enables = enables;
        tc.atspeed = atspeed;
        tc.indexrotary = indexrotary;

        if self.enable_blend_arcs {
            handle_blend_arc(&mut self.queue, &mut tc, self.cycle_time);
        }

        self.queue.put(tc).map_err(|_| TpError::QueueFull)?;
        self.finish_add(end, enables);
        Ok(())
    }

    /// Append a circular/helical move ending at `end`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_circle(
        &mut self,
        end: Pose,
        center: Cart,
        normal: Cart,
        turn: u32,
        canon_kind: MotionType,
        vel: f64,
        ini_maxvel: f64,
        acc: f64,
        enables: EnableFlags,
        atspeed: bool,
    ) -> TpResult<()> {
        self.check_add(vel, ini_maxvel, acc)?;

        let Some(circle) =
            Circle::from_center_normal(self.goal_pos.xyz(), end.xyz(), center, normal, turn)
        else {
            return Err(TpError::InvalidArgument("degenerate circle"));
        };
        let geom = CircleGeom {
            xyz: circle,
            abc: CartLine::new(self.goal_pos.abc(), end.abc()),
            uvw: CartLine::new(self.goal_pos.uvw(), end.uvw()),
        };
        let target = circle.arclength();

        let mut tc = self.new_segment(SegGeom::Circle(geom), target, canon_kind, vel, ini_maxvel, acc);
        tc.enables = enables;
        tc.atspeed = atspeed;

        self.queue.put(tc).map_err(|_| TpError::QueueFull)?;
        self.finish_add(end, enables);
        Ok(())
    }

    /// Append a rigid-tap cycle toward `end`. Requires position-mode
    /// spindle sync; the motion returns to the entry point, so the goal
    /// pose is left where it is.
    pub fn add_rigid_tap(
        &mut self,
        end: Pose,
        vel: f64,
        ini_maxvel: f64,
        acc: f64,
        enables: EnableFlags,
    ) -> TpResult<()> {
        self.check_add(vel, ini_maxvel, acc)?;
        if self.sync_uu_per_rev <= 0.0 || self.sync_velocity_mode {
            return Err(TpError::UnsynchronizedTap);
        }

        let xyz = CartLine::new(self.goal_pos.xyz(), end.xyz());
        if xyz.zero_mag {
            return Err(TpError::InvalidArgument("zero-length tap"));
        }
        if (end.abc() - self.goal_pos.abc()).mag() > EPS_MAG
            || (end.uvw() - self.goal_pos.uvw()).mag() > EPS_MAG
        {
            return Err(TpError::InvalidArgument("rigid tap must be a pure XYZ move"));
        }

        let geom = TapGeom {
            xyz,
            state: TapState::Tapping,
            reversal_target: xyz.mag,
            spindlerevs_at_reversal: 0.0,
            prev_spindle_pos: 0.0,
            home: xyz.start,
            abc: self.goal_pos.abc(),
            uvw: self.goal_pos.uvw(),
        };
        let target = xyz.mag + omk_common::consts::TAP_OVERRUN_REVS * self.sync_uu_per_rev;

        let mut tc = self.new_segment(
            SegGeom::RigidTap(geom),
            target,
            MotionType::Tap,
            vel,
            ini_maxvel,
            acc,
        );
        tc.enables = enables;
        tc.atspeed = true;
        tc.term_cond = TermCond::Stop;

        self.queue.put(tc).map_err(|_| TpError::QueueFull)?;
        // the pass ends back at its entry: goal pose stays
        self.finish_add(self.goal_pos, enables);
        Ok(())
    }

    // ─── Construction internals ─────────────────────────────────────

    fn check_add(&self, vel: f64, ini_maxvel: f64, acc: f64) -> TpResult<()> {
        if self.aborting {
            return Err(TpError::Aborting);
        }
        if self.queue.is_full() {
            return Err(TpError::QueueFull);
        }
        if !(vel.is_finite() && vel > 0.0 && ini_maxvel.is_finite() && ini_maxvel > 0.0) {
            return Err(TpError::InvalidArgument("velocity must be positive"));
        }
        if !(acc.is_finite() && acc > 0.0) {
            return Err(TpError::InvalidArgument("acceleration must be positive"));
        }
        Ok(())
    }

    /// Common construction preamble: runtime fields zeroed, request
    /// capped by the rapid limit, hard cap at the sample-rate bound,
    /// staged I/O snapshotted in, sync settings stamped on.
    fn new_segment(
        &mut self,
        geom: SegGeom,
        target: f64,
        canon_kind: MotionType,
        vel: f64,
        ini_maxvel: f64,
        acc: f64,
    ) -> Segment {
        let mut tc = Segment::new(self.next_id, geom, target);
        tc.canon_kind = canon_kind;
        tc.maxvel = ini_maxvel.min(SAMPLE_VEL_FACTOR * target / self.cycle_time);
        tc.reqvel = vel.min(ini_maxvel).min(tc.maxvel);
        tc.maxaccel = acc;
        tc.term_cond = self.term_cond;
        tc.tolerance = self.tolerance;
        if self.sync_uu_per_rev > 0.0 {
            tc.sync = if self.sync_velocity_mode {
                SyncMode::Velocity
            } else {
                SyncMode::Position
            };
            tc.uu_per_rev = self.sync_uu_per_rev;
        }
        tc.syncdio = core::mem::take(&mut self.syncdio);
        tc
    }

    fn finish_add(&mut self, goal: Pose, enables: EnableFlags) {
        self.goal_pos = goal;
        self.done = false;
        self.enables_latest = enables;
        self.next_id = match self.next_id.wrapping_add(1) {
            INVALID_MOTION_ID => INVALID_MOTION_ID + 1,
            id => id,
        };
        run_optimizer(&mut self.queue, self.lookahead_depth);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
