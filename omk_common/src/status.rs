//! Planner status block and per-cycle feedback.
//!
//! [`TpStatus`] is the outbound snapshot the planner refreshes every tick
//! for its host; [`MotionFeedback`] is the inbound image of spindle and
//! override state the host refreshes before each tick. Both are plain
//! `#[repr(C)]`-friendly data so a host can place them in shared memory.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::consts::INVALID_MOTION_ID;
use crate::geom::Pose;

// ─── Motion type ────────────────────────────────────────────────────

/// Kind of motion currently executing, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionType {
    /// Queue empty, no motion.
    None = 0,
    /// Rapid positioning (feed override pinned to 1).
    Traverse = 1,
    /// Feed-rate motion.
    Feed = 2,
    /// Circular/helical feed motion.
    Arc = 3,
    /// Rigid-tap pass.
    Tap = 4,
}

impl MotionType {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Traverse),
            2 => Some(Self::Feed),
            3 => Some(Self::Arc),
            4 => Some(Self::Tap),
            _ => None,
        }
    }
}

impl Default for MotionType {
    fn default() -> Self {
        Self::None
    }
}

// ─── Enable flags ───────────────────────────────────────────────────

bitflags::bitflags! {
    /// Override/hold enables queued through segments to the host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EnableFlags: u32 {
        const FEED_OVERRIDE    = 1 << 0;
        const SPINDLE_OVERRIDE = 1 << 1;
        const ADAPTIVE_FEED    = 1 << 2;
        const FEED_HOLD        = 1 << 3;
    }
}

// ─── Inbound feedback ───────────────────────────────────────────────

/// Per-tick inbound state, refreshed by the host before `run_cycle`.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct MotionFeedback {
    /// Accumulated spindle revolutions from the encoder.
    pub spindle_revs: f64,
    /// Commanded spindle speed [rev/s], signed.
    pub spindle_speed_in: f64,
    /// Net feed override scale (1.0 = nominal).
    pub net_feed_scale: f64,
    /// Spindle rotation sense at spindle start: +1 or -1.
    pub spindle_direction: i32,
    /// Spindle has reached commanded speed.
    pub spindle_at_speed: bool,
    /// Encoder index-latch line; hardware clears it once the index
    /// passes after the planner raises the request.
    pub spindle_index_enable: bool,
}

impl Default for MotionFeedback {
    fn default() -> Self {
        Self {
            spindle_revs: 0.0,
            spindle_speed_in: 0.0,
            net_feed_scale: 1.0,
            spindle_direction: 1,
            spindle_at_speed: false,
            spindle_index_enable: false,
        }
    }
}

impl MotionFeedback {
    /// Spindle position signed by the rotation sense.
    #[inline]
    pub fn signed_spindle_pos(&self) -> f64 {
        if self.spindle_direction < 0 {
            -self.spindle_revs
        } else {
            self.spindle_revs
        }
    }
}

// ─── Outbound status ────────────────────────────────────────────────

/// Outbound planner status, refreshed every tick.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct TpStatus {
    /// Current commanded pose.
    pub position: Pose,
    /// Per-axis distance to go on the primary segment.
    pub dtg: Pose,
    /// Tool-path velocity (sum of both segments during a parabolic
    /// blend).
    pub current_vel: f64,
    /// Requested velocity of the head segment, before override scaling.
    pub requested_vel: f64,
    /// Scalar distance to go on the primary segment.
    pub distance_to_go: f64,
    /// Commanded spindle speed [rev/s]; rigid tapping flips its sign.
    pub spindle_speed_out: f64,
    /// Id of the executing segment, [`INVALID_MOTION_ID`] when idle.
    pub exec_id: u32,
    /// Segments in the queue.
    pub queue_len: u32,
    /// Segments advanced this tick (0, 1, or 2 during a blend).
    pub active_depth: u32,
    /// Segment id stalled on the encoder index, or
    /// [`INVALID_MOTION_ID`].
    pub waiting_for_index: u32,
    /// Segment id stalled on spindle at-speed, or
    /// [`INVALID_MOTION_ID`].
    pub waiting_for_atspeed: u32,
    /// Enables of the executing segment ([`EnableFlags`] bits).
    pub enables_queued: u32,
    /// Enables in effect (falls back to the latest queued set when
    /// idle).
    pub enables_active: u32,
    /// Kind of the executing motion.
    pub motion_type: MotionType,
    /// Segment progress is locked to the spindle encoder.
    pub spindle_sync: bool,
    /// Planner is requesting an encoder index latch.
    pub spindle_index_enable: bool,
    /// Planner is pausing (or draining an abort).
    pub paused: bool,
    /// Queue empty and motion complete.
    pub done: bool,
}

impl Default for TpStatus {
    fn default() -> Self {
        Self {
            position: Pose::ZERO,
            dtg: Pose::ZERO,
            current_vel: 0.0,
            requested_vel: 0.0,
            distance_to_go: 0.0,
            spindle_speed_out: 0.0,
            exec_id: INVALID_MOTION_ID,
            queue_len: 0,
            active_depth: 0,
            waiting_for_index: INVALID_MOTION_ID,
            waiting_for_atspeed: INVALID_MOTION_ID,
            enables_queued: 0,
            enables_active: 0,
            motion_type: MotionType::None,
            spindle_sync: false,
            spindle_index_enable: false,
            paused: false,
            done: true,
        }
    }
}

// Keep the snapshot compact and 8-byte aligned for zero-copy hosts.
const_assert!(core::mem::size_of::<TpStatus>() <= 256);
const_assert!(core::mem::size_of::<TpStatus>() % 8 == 0);
const_assert!(core::mem::size_of::<Pose>() == 72);

// ─── Tests ──────────────────────────────────────────────────────────
