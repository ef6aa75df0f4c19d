//! Parabolic blending between consecutive moves: velocity never dips
//! to zero at the junction and the handovers preserve total distance.

use omk_common::status::TpStatus;
use omk_planner::TrajPlanner;

use super::harness::{RecordingIo, add_feed_line, drive_to_done, pose_x, pose_xy};

#[test]
fn collinear_pair_keeps_velocity_through_junction() {
    // parabolic termination is the planner default
    let mut tp = TrajPlanner::new(16).expect("planner");
    add_feed_line(&mut tp, pose_x(5.0));
    add_feed_line(&mut tp, pose_x(10.0));

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let trace = drive_to_done(&mut tp, &mut io, &mut status, 10_000);

    assert!((tp.pos().x - 10.0).abs() < 1e-6, "end {}", tp.pos().x);

    // once under way, the velocity stays well above zero until the
    // final deceleration into the last endpoint
    let min_mid = trace
        .iter()
        .filter(|(p, _)| p.x > 1.0 && p.x < 9.0)
        .map(|(_, v)| *v)
        .fold(f64::INFINITY, f64::min);
    assert!(min_mid > 10.0, "velocity dipped to {min_mid} mid-path");
}

#[test]
fn active_depth_reports_two_while_blending() {
    let mut tp = TrajPlanner::new(16).expect("planner");
    add_feed_line(&mut tp, pose_x(5.0));
    add_feed_line(&mut tp, pose_x(10.0));

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let fb = omk_common::status::MotionFeedback::default();

    let mut saw_depth_two = false;
    for _ in 0..10_000 {
        tp.run_cycle(&fb, &mut io, &mut status);
        if status.active_depth == 2 {
            saw_depth_two = true;
        }
        if tp.is_done() {
            break;
        }
    }
    assert!(saw_depth_two, "blend never overlapped two segments");
}

#[test]
fn right_angle_corner_slows_but_does_not_stop() {
    let mut tp = TrajPlanner::new(16).expect("planner");
    add_feed_line(&mut tp, pose_x(10.0));
    add_feed_line(&mut tp, pose_xy(10.0, 10.0));

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let trace = drive_to_done(&mut tp, &mut io, &mut status, 20_000);

    let end = tp.pos();
    assert!((end.x - 10.0).abs() < 1e-6);
    assert!((end.y - 10.0).abs() < 1e-6);

    // the corner is blended: no full stop between the two moves
    let min_mid = trace
        .iter()
        .filter(|(p, _)| p.x > 1.0 && p.y < 9.0)
        .map(|(_, v)| *v)
        .fold(f64::INFINITY, f64::min);
    assert!(min_mid > 0.5, "corner velocity fell to {min_mid}");
}
