//! Single-move end-to-end scenario: a 10-unit exact-stop line at
//! vel 100, accel 1000, 1 kHz.

use omk_common::geom::Pose;
use omk_common::status::TpStatus;
use omk_planner::TrajPlanner;
use omk_planner::segment::TermCond;

use super::harness::{RecordingIo, add_feed_line, drive_to_done, pose_x};

fn exact_stop_planner() -> TrajPlanner {
    let mut tp = TrajPlanner::new(16).expect("planner");
    tp.set_term_cond(TermCond::Stop, 0.0).expect("term cond");
    tp
}

#[test]
fn reaches_peak_velocity_and_exact_endpoint() {
    let mut tp = exact_stop_planner();
    tp.set_pos(Pose::ZERO);
    add_feed_line(&mut tp, pose_x(10.0));

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let trace = drive_to_done(&mut tp, &mut io, &mut status, 5000);

    // triangle profile just touches the requested 100
    let peak = trace.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    assert!(peak <= 100.0 + 1e-9, "peak {peak}");
    assert!(peak >= 99.0, "peak {peak}");

    assert!((tp.pos().x - 10.0).abs() < 1e-9);
    assert!(status.done);
    assert_eq!(status.current_vel, 0.0);
}

#[test]
fn position_is_monotonic_and_velocity_bounded() {
    let mut tp = exact_stop_planner();
    add_feed_line(&mut tp, pose_x(10.0));

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let trace = drive_to_done(&mut tp, &mut io, &mut status, 5000);

    let mut prev_x = 0.0;
    let mut prev_v = 0.0;
    for (pos, vel) in &trace {
        assert!(pos.x >= prev_x - 1e-12, "position went backwards");
        assert!(*vel <= 100.0 + 1e-9);
        // accel bound: 1000 uu/s^2 at 1 kHz
        assert!((vel - prev_v).abs() <= 1.0 + 1e-6, "accel spike");
        prev_x = pos.x;
        prev_v = *vel;
    }
}

#[test]
fn distance_to_go_counts_down() {
    let mut tp = exact_stop_planner();
    add_feed_line(&mut tp, pose_x(10.0));

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();

    let fb = omk_common::status::MotionFeedback::default();
    tp.run_cycle(&fb, &mut io, &mut status);
    let mut prev_dtg = status.distance_to_go;
    assert!(prev_dtg <= 10.0);
    while !tp.is_done() {
        tp.run_cycle(&fb, &mut io, &mut status);
        assert!(status.distance_to_go <= prev_dtg + 1e-12);
        prev_dtg = status.distance_to_go;
    }
    assert_eq!(status.distance_to_go, 0.0);
}

#[test]
fn staged_io_fires_once_when_the_segment_starts() {
    let mut tp = exact_stop_planner();
    tp.set_dout(3, true, false).expect("set_dout");
    tp.set_aout(1, 0.75, 0.0).expect("set_aout");
    add_feed_line(&mut tp, pose_x(1.0));

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    drive_to_done(&mut tp, &mut io, &mut status, 5000);

    assert_eq!(io.dio, vec![(3, true)]);
    assert_eq!(io.aio, vec![(1, 0.75)]);
}

#[test]
fn exec_id_reported_during_motion() {
    let mut tp = exact_stop_planner();
    tp.set_id(9).expect("set id");
    add_feed_line(&mut tp, pose_x(1.0));

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let fb = omk_common::status::MotionFeedback::default();
    tp.run_cycle(&fb, &mut io, &mut status);
    assert_eq!(status.exec_id, 9);
    assert_eq!(tp.exec_id(), 9);
}
