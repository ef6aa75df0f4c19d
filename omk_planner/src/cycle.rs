//! Per-tick cycle driver.
//!
//! One call to [`TrajPlanner::run_cycle`] per servo period:
//! complete finished segments, activate the head (stalling on at-speed,
//! rotary-unlock and encoder-index gates), advance the rigid-tap
//! substate, run the spindle sync controller, profile the head (and the
//! successor during a parabolic blend or a tangent carry-over), apply
//! staged I/O, and refresh the status block. The driver never blocks,
//! never allocates and never returns an error; every wait is a stall
//! state that simply leaves motion where it was.

use tracing::debug;

use omk_common::consts::INVALID_MOTION_ID;
use omk_common::io::MotionIo;
use omk_common::status::{MotionFeedback, MotionType, TpStatus};

use crate::blend::parabolic_blend_velocity;
use crate::planner::TrajPlanner;
use crate::profile::{TickContext, tc_run_cycle};
use crate::rigidtap::handle_rigid_tap;
use crate::segment::{SegGeom, SyncMode, TermCond};
use crate::spindle::{sync_position_mode, sync_velocity_mode};

impl TrajPlanner {
    /// Advance motion by one servo tick.
    pub fn run_cycle(
        &mut self,
        fb: &MotionFeedback,
        io: &mut dyn MotionIo,
        status: &mut TpStatus,
    ) {
        self.feed_scale = fb.net_feed_scale;
        let cycle_time = self.cycle_time;
        let vlimit = self.vlimit;
        let signed_pos = fb.signed_spindle_pos();

        status.queue_len = self.queue.len() as u32;

        // ── Completion: retire finished head segments ───────────────
        loop {
            let Some(tc) = self.queue.item(0) else {
                self.spindle_speed_out = fb.spindle_speed_in;
                self.reset_to_idle(status);
                return;
            };
            if tc.target != tc.progress || self.waiting_for_atspeed == Some(tc.id) {
                break;
            }
            let (synchronized, target, uu_per_rev, indexrotary) = (
                tc.is_synchronized(),
                tc.target,
                tc.uu_per_rev,
                tc.indexrotary,
            );
            // keep the next synced move in tune with the spindle
            if synchronized && uu_per_rev > 0.0 {
                self.spindle.offset += target / uu_per_rev;
            } else {
                self.spindle.offset = 0.0;
            }
            if let Some(axis) = indexrotary {
                io.rotary_unlock(axis, false);
            }
            self.queue.pop_front();
        }

        let (head_id, head_currentvel, head_active, head_atspeed, head_indexrotary) = {
            // reborrow: the loop above may have popped
            let Some(tc) = self.queue.item(0) else { return };
            (tc.id, tc.currentvel, tc.active, tc.atspeed, tc.indexrotary)
        };

        // ── Successor candidate and its suppression ─────────────────
        let mut use_next = self.queue.len() > 1
            && self
                .queue
                .item(0)
                .is_some_and(|tc| tc.term_cond != TermCond::Stop);
        if use_next {
            let head_sync = self.queue.item(0).is_some_and(|tc| tc.is_synchronized());
            let suppress = self.queue.item(1).is_some_and(|next| {
                (next.sync == SyncMode::Position && !head_sync) || next.atspeed
            });
            if suppress {
                // the successor must start from rest anyway: stop at
                // the boundary instead of blending into it
                if let Some(tc) = self.queue.item_mut(0) {
                    tc.term_cond = TermCond::Stop;
                }
                use_next = false;
            }
        }

        // ── Abort: drain to rest, then reset everything ─────────────
        if self.aborting {
            let next_stopped = !use_next
                || self
                    .queue
                    .item(1)
                    .is_some_and(|next| next.currentvel == 0.0);
            if self.waiting_for_index.is_some()
                || self.waiting_for_atspeed.is_some()
                || (head_currentvel == 0.0 && next_stopped)
            {
                self.spindle_speed_out = fb.spindle_speed_in;
                self.reset_to_idle(status);
                return;
            }
            // still moving: fall through and profile with override 0
        }

        // ── At-speed wait ───────────────────────────────────────────
        if let Some(wid) = self.waiting_for_atspeed {
            if wid != head_id {
                debug!(wid, head_id, "clearing stale at-speed wait");
                self.waiting_for_atspeed = None;
            } else if !fb.spindle_at_speed {
                self.publish_stall(status);
                return;
            } else {
                self.waiting_for_atspeed = None;
            }
        }

        // ── Head activation ─────────────────────────────────────────
        if !head_active {
            if head_atspeed && !fb.spindle_at_speed {
                self.waiting_for_atspeed = Some(head_id);
                self.publish_stall(status);
                return;
            }
            if let Some(axis) = head_indexrotary {
                io.rotary_unlock(axis, true);
                if !io.rotary_is_unlocked(axis) {
                    self.publish_stall(status);
                    return;
                }
            }
            let mut arm_index = false;
            if let Some(tc) = self.queue.item_mut(0) {
                tc.active = true;
                tc.currentvel = 0.0;
                if tc.term_cond == TermCond::Parabolic {
                    tc.accel_scale = 0.5;
                }
                arm_index = tc.sync == SyncMode::Position;
                self.exec_id = tc.id;
                self.motion_type = tc.canon_kind;
            }
            self.active_depth = 1;
            if arm_index && !self.spindle_sync_active && self.waiting_for_index.is_none() {
                // fresh position sync: ask the encoder for an index
                // latch and hold position until it happens
                self.waiting_for_index = Some(head_id);
                self.index_enable_req = true;
                self.spindle.offset = 0.0;
                self.publish_stall(status);
                return;
            }
        }

        // ── Index wait / clearance ──────────────────────────────────
        if let Some(wid) = self.waiting_for_index {
            if wid != head_id {
                debug!(wid, head_id, "clearing stale index wait");
                self.waiting_for_index = None;
                self.index_enable_req = false;
            } else if fb.spindle_index_enable {
                self.publish_stall(status);
                return;
            } else {
                self.waiting_for_index = None;
                self.index_enable_req = false;
                self.spindle_sync_active = true;
                self.spindle.revs = 0.0;
                if let Some(tc) = self.queue.item_mut(0) {
                    tc.sync_accel = 1;
                }
            }
        }

        // ── Rigid tap substate / spindle speed mirror ───────────────
        let head_is_tap = self
            .queue
            .item(0)
            .is_some_and(|tc| matches!(tc.geom, SegGeom::RigidTap(_)));
        if head_is_tap {
            if self.spindle_speed_out == 0.0 {
                self.spindle_speed_out = fb.spindle_speed_in;
            }
            let offset = self.spindle.offset;
            if let Some(tc) = self.queue.item_mut(0) {
                if handle_rigid_tap(tc, signed_pos, offset) {
                    self.spindle_speed_out = -self.spindle_speed_out;
                }
            }
        } else {
            self.spindle_speed_out = fb.spindle_speed_in;
        }

        // re-read after the tap machine: it may drop synchronisation
        let (head_sync_mode, head_canon) = {
            let Some(tc) = self.queue.item(0) else { return };
            (tc.sync, tc.canon_kind)
        };
        if head_sync_mode == SyncMode::None {
            self.spindle_sync_active = false;
        }

        // ── Lazy successor activation ───────────────────────────────
        if use_next {
            let (head_ref, next_ref) = self.queue.front_pair_mut();
            if let (Some(head), Some(next)) = (head_ref, next_ref) {
                if !next.active {
                    next.active = true;
                    next.currentvel = 0.0;
                    next.blending = false;
                    if next.term_cond == TermCond::Parabolic
                        || head.term_cond == TermCond::Parabolic
                    {
                        next.accel_scale = 0.5;
                    }
                }
            }
        }

        // ── Spindle sync controller ─────────────────────────────────
        let next_progress = if use_next {
            self.queue.item(1).map(|next| next.progress)
        } else {
            None
        };
        match head_sync_mode {
            SyncMode::Velocity => {
                self.spindle_sync_active = true;
                if let Some(tc) = self.queue.item_mut(0) {
                    sync_velocity_mode(tc, next_progress, fb.spindle_speed_in);
                }
            }
            SyncMode::Position => {
                if let Some(tc) = self.queue.item_mut(0) {
                    sync_position_mode(tc, next_progress, &mut self.spindle, signed_pos, cycle_time);
                }
            }
            SyncMode::None => {}
        }

        // both ends of a blend locked to the spindle share one request
        if head_sync_mode != SyncMode::None && use_next {
            let (head_ref, next_ref) = self.queue.front_pair_mut();
            if let (Some(head), Some(next)) = (head_ref, next_ref) {
                if next.is_synchronized() {
                    next.reqvel = head.reqvel;
                }
            }
        }

        // ── Parabolic handover velocity ─────────────────────────────
        let blend_vel = if use_next
            && self
                .queue
                .item(0)
                .is_some_and(|tc| tc.term_cond == TermCond::Parabolic)
        {
            match (self.queue.item(0), self.queue.item(1)) {
                (Some(head), Some(next)) => parabolic_blend_velocity(head, next),
                _ => 0.0,
            }
        } else {
            0.0
        };

        // ── Profile and integrate ───────────────────────────────────
        let ovr_head = self.feed_scale_for(head_canon, head_sync_mode);
        let ovr_next = match self.queue.item(1) {
            Some(next) if use_next => self.feed_scale_for(next.canon_kind, next.sync),
            _ => 1.0,
        };
        let pausing = self.pausing || self.aborting;

        let mut primary_is_next = false;
        let mut advanced_two = false;
        let displacement;
        let vel_for_status;
        let requested_vel;
        {
            let (head_opt, next_opt) = self.queue.front_pair_mut();
            let Some(head) = head_opt else { return };
            let next_opt = if use_next { next_opt } else { None };

            let ctx = TickContext {
                cycle_time,
                vlimit,
                feed_override: ovr_head,
                pausing,
            };
            let before = head.point_at(head.progress);
            let out = tc_run_cycle(head, &ctx);
            let after = head.point_at(head.progress);
            let mut disp = after - before;
            let mut vel = head.currentvel;
            requested_vel = head.reqvel;

            if head.term_cond == TermCond::Tangent && head.progress >= head.target {
                // C1 handover: the successor absorbs the overshoot and
                // inherits the velocity
                let overshoot = head.progress - head.target;
                head.progress = head.target;
                if let Some(next) = next_opt {
                    let nb = next.point_at(next.progress);
                    next.progress = overshoot.min(next.target);
                    next.currentvel = head.currentvel;
                    next.active = true;
                    let na = next.point_at(next.progress);
                    disp += na - nb;
                    advanced_two = true;
                }
            } else if head.term_cond == TermCond::Parabolic {
                if let Some(next) = next_opt {
                    let start_blend =
                        out.on_final_decel && head.currentvel < blend_vel;
                    if head.blending || start_blend {
                        head.blending = true;
                        // the successor soaks up exactly the velocity
                        // the head is shedding
                        let save = next.reqvel;
                        next.reqvel = if ovr_next > 0.0 {
                            (head.vel_at_blend_start - head.currentvel) / ovr_next
                        } else {
                            0.0
                        };
                        let nctx = TickContext {
                            cycle_time,
                            vlimit,
                            feed_override: ovr_next,
                            pausing,
                        };
                        let nb = next.point_at(next.progress);
                        tc_run_cycle(next, &nctx);
                        let na = next.point_at(next.progress);
                        next.reqvel = save;
                        disp += na - nb;
                        vel = head.currentvel + next.currentvel;
                        primary_is_next = next.currentvel > head.currentvel;
                        advanced_two = true;
                    }
                }
            }

            displacement = disp;
            vel_for_status = vel;
        }
        self.current_pos += displacement;
        self.active_depth = if advanced_two { 2 } else { 1 };

        // ── Staged I/O of the primary segment, once ─────────────────
        let primary_index = usize::from(primary_is_next);
        if let Some(primary) = self.queue.item_mut(primary_index) {
            if !primary.syncdio.is_empty() {
                primary.syncdio.apply_start(io);
                primary.syncdio.clear();
            }
        }

        // ── Status ──────────────────────────────────────────────────
        if let Some(primary) = self.queue.item(primary_index) {
            self.exec_id = primary.id;
            self.motion_type = primary.canon_kind;
            status.distance_to_go = primary.distance_to_go();
            status.dtg = primary.end_point() - self.current_pos;
            status.enables_queued = primary.enables.bits();
            status.enables_active = primary.enables.bits();
        }
        status.position = self.current_pos;
        status.current_vel = vel_for_status;
        status.requested_vel = requested_vel;
        status.exec_id = self.exec_id;
        status.motion_type = self.motion_type;
        status.queue_len = self.queue.len() as u32;
        status.active_depth = self.active_depth;
        status.spindle_sync = self.spindle_sync_active;
        status.spindle_index_enable = self.index_enable_req;
        status.spindle_speed_out = self.spindle_speed_out;
        status.waiting_for_index = self.waiting_for_index.unwrap_or(INVALID_MOTION_ID);
        status.waiting_for_atspeed = self.waiting_for_atspeed.unwrap_or(INVALID_MOTION_ID);
        status.paused = self.pausing;
        status.done = self.done;
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Net feed override for a segment: pinned to 1 for rapids and
    /// position-synced moves, 0 while pausing or aborting.
    pub(crate) fn feed_scale_for(&self, canon: MotionType, sync: SyncMode) -> f64 {
        if self.pausing || self.aborting {
            return 0.0;
        }
        if canon == MotionType::Traverse || sync == SyncMode::Position {
            return 1.0;
        }
        self.feed_scale
    }

    /// Empty-queue / post-abort reset: drop everything derived
    /// (including any staged I/O edges), keep the pose, resume from any
    /// pause, fall back to the latest enables.
    fn reset_to_idle(&mut self, status: &mut TpStatus) {
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
        status.position = self.current_pos;
        status.dtg = omk_common::geom::Pose::ZERO;
        status.current_vel = 0.0;
        status.requested_vel = 0.0;
        status.distance_to_go = 0.0;
        status.exec_id = INVALID_MOTION_ID;
        status.motion_type = MotionType::None;
        status.queue_len = 0;
        status.active_depth = 0;
        status.enables_queued = self.enables_latest.bits();
        status.enables_active = self.enables_latest.bits();
        status.spindle_sync = false;
        status.spindle_index_enable = false;
        status.spindle_speed_out = self.spindle_speed_out;
        status.waiting_for_index = INVALID_MOTION_ID;
        status.waiting_for_atspeed = INVALID_MOTION_ID;
        status.paused = false;
        status.done = true;
    }

    /// Publish the waiting/paused picture of a stalled tick without
    /// advancing motion.
    fn publish_stall(&self, status: &mut TpStatus) {
        status.position = self.current_pos;
        status.current_vel = 0.0;
        status.queue_len = self.queue.len() as u32;
        status.active_depth = self.active_depth;
        status.exec_id = self.exec_id;
        status.motion_type = self.motion_type;
        status.spindle_sync = self.spindle_sync_active;
        status.spindle_index_enable = self.index_enable_req;
        status.spindle_speed_out = self.spindle_speed_out;
        status.waiting_for_index = self.waiting_for_index.unwrap_or(INVALID_MOTION_ID);
        status.waiting_for_atspeed = self.waiting_for_atspeed.unwrap_or(INVALID_MOTION_ID);
        status.paused = self.pausing;
        status.done = self.done;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
