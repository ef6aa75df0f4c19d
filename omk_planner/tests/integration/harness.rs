//! Shared helpers for the integration scenarios.

use omk_common::geom::Pose;
use omk_common::io::MotionIo;
use omk_common::status::{EnableFlags, MotionFeedback, MotionType, TpStatus};
use omk_planner::TrajPlanner;

/// Recording hardware shim: captures every write and reports rotary
/// axes as unlocked.
#[derive(Debug, Default)]
pub struct RecordingIo {
    pub dio: Vec<(u8, bool)>,
    pub aio: Vec<(u8, f64)>,
    pub unlock_requests: Vec<(u8, bool)>,
}

impl MotionIo for RecordingIo {
    fn dio_write(&mut self, index: u8, value: bool) {
        self.dio.push((index, value));
    }
    fn aio_write(&mut self, index: u8, value: f64) {
        self.aio.push((index, value));
    }
    fn rotary_unlock(&mut self, axis: u8, unlock: bool) {
        self.unlock_requests.push((axis, unlock));
    }
    fn rotary_is_unlocked(&self, _axis: u8) -> bool {
        true
    }
}

pub fn pose_xy(x: f64, y: f64) -> Pose {
    Pose {
        x,
        y,
        ..Pose::ZERO
    }
}

pub fn pose_x(x: f64) -> Pose {
    pose_xy(x, 0.0)
}

/// Append a feed move with the scenario-standard limits
/// (vel 100, rapid 200, accel 1000).
pub fn add_feed_line(tp: &mut TrajPlanner, end: Pose) {
    tp.add_line(
        end,
        MotionType::Feed,
        100.0,
        200.0,
        1000.0,
        EnableFlags::empty(),
        false,
        None,
    )
    .expect("add_line");
}

/// One cycle with default feedback.
pub fn tick(tp: &mut TrajPlanner, io: &mut RecordingIo, status: &mut TpStatus) {
    let fb = MotionFeedback::default();
    tp.run_cycle(&fb, io, status);
}

/// Drive with default feedback until `is_done`, recording the velocity
/// and position trace. Panics if the motion does not finish.
pub fn drive_to_done(
    tp: &mut TrajPlanner,
    io: &mut RecordingIo,
    status: &mut TpStatus,
    max_ticks: usize,
) -> Vec<(Pose, f64)> {
    let fb = MotionFeedback::default();
    let mut trace = Vec::new();
    for _ in 0..max_ticks {
        tp.run_cycle(&fb, io, status);
        trace.push((status.position, status.current_vel));
        if tp.is_done() {
            return trace;
        }
    }
    panic!("motion did not finish within {max_ticks} ticks");
}
