//! Circular interpolation end to end: a quarter circle stays on its
//! radius and lands exactly on the programmed endpoint.

use omk_common::geom::{Cart, Pose};
use omk_common::status::{EnableFlags, MotionType, TpStatus};
use omk_planner::TrajPlanner;
use omk_planner::segment::TermCond;

use super::harness::{RecordingIo, drive_to_done};

#[test]
fn quarter_circle_holds_radius_to_endpoint() {
    let mut tp = TrajPlanner::new(16).expect("planner");
    tp.set_term_cond(TermCond::Stop, 0.0).expect("term");

    let center = Cart::new(0.0, 10.0, 0.0);
    let end = Pose {
        x: -10.0,
        y: 10.0,
        ..Pose::ZERO
    };
    tp.add_circle(
        end,
        center,
        Cart::new(0.0, 0.0, 1.0),
        0,
        MotionType::Arc,
        50.0,
        100.0,
        1000.0,
        EnableFlags::empty(),
        false,
    )
    .expect("add_circle");

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let trace = drive_to_done(&mut tp, &mut io, &mut status, 10_000);

    // every sample stays on the circle
    for (pos, _) in &trace {
        let r = (pos.xyz() - center).mag();
        assert!((r - 10.0).abs() < 1e-6, "radius drifted to {r}");
    }

    let final_pos = tp.pos();
    assert!((final_pos.x - end.x).abs() < 1e-9);
    assert!((final_pos.y - end.y).abs() < 1e-9);
    assert_eq!(status.motion_type, MotionType::None);
    assert!(status.done);
}

#[test]
fn helical_move_interpolates_the_rise() {
    let mut tp = TrajPlanner::new(16).expect("planner");
    tp.set_term_cond(TermCond::Stop, 0.0).expect("term");

    // full turn of radius 5 with 2 units of Z rise
    let start = Pose {
        x: 5.0,
        ..Pose::ZERO
    };
    tp.set_pos(start);
    let end = Pose {
        x: 5.0,
        z: 2.0,
        ..Pose::ZERO
    };
    tp.add_circle(
        end,
        Cart::ZERO,
        Cart::new(0.0, 0.0, 1.0),
        0,
        MotionType::Arc,
        50.0,
        100.0,
        1000.0,
        EnableFlags::empty(),
        false,
    )
    .expect("add_circle");

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let trace = drive_to_done(&mut tp, &mut io, &mut status, 20_000);

    // the rise is monotonic and ends at the programmed height
    let mut prev_z = 0.0;
    for (pos, _) in &trace {
        assert!(pos.z >= prev_z - 1e-9, "rise reversed");
        prev_z = pos.z;
    }
    assert!((tp.pos().z - 2.0).abs() < 1e-9);
}
