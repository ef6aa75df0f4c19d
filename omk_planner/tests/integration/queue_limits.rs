//! Bounded-queue behaviour through the public API.

use omk_common::status::{EnableFlags, MotionType, TpStatus};
use omk_planner::config::PlannerConfig;
use omk_planner::{TpError, TrajPlanner};

use super::harness::{RecordingIo, pose_x, tick};

fn small_planner() -> TrajPlanner {
    let cfg = PlannerConfig {
        queue_size: 8,
        ..PlannerConfig::default()
    };
    TrajPlanner::from_config(&cfg).expect("planner")
}

fn short_line(tp: &mut TrajPlanner, x: f64) -> Result<(), TpError> {
    tp.add_line(
        pose_x(x),
        MotionType::Feed,
        100.0,
        200.0,
        1000.0,
        EnableFlags::empty(),
        false,
        None,
    )
}

#[test]
fn append_fails_when_full_then_recovers() {
    let mut tp = small_planner();
    for i in 1..=8 {
        short_line(&mut tp, i as f64 * 0.05).expect("fill");
    }
    assert_eq!(tp.queue_depth(), 8);
    assert_eq!(short_line(&mut tp, 9.0), Err(TpError::QueueFull));

    // consume until a slot frees, then the append goes through
    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let mut appended = false;
    for _ in 0..2000 {
        tick(&mut tp, &mut io, &mut status);
        if tp.queue_depth() < 8 {
            short_line(&mut tp, 9.0).expect("append after drain");
            appended = true;
            break;
        }
    }
    assert!(appended, "queue never drained a slot");
    assert_eq!(tp.queue_depth(), 8);
}

#[test]
fn queue_depth_is_published() {
    let mut tp = small_planner();
    short_line(&mut tp, 1.0).expect("add");
    short_line(&mut tp, 2.0).expect("add");

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    tick(&mut tp, &mut io, &mut status);
    assert_eq!(status.queue_len, 2);
    assert_eq!(tp.queue_depth(), 2);
}
