//! Pause, resume, abort and feed-override contracts.

use omk_common::status::{MotionFeedback, TpStatus};
use omk_planner::{TpError, TrajPlanner};
use omk_planner::segment::TermCond;

use super::harness::{RecordingIo, add_feed_line, pose_x, tick};

fn planner_with_line() -> TrajPlanner {
    let mut tp = TrajPlanner::new(16).expect("planner");
    tp.set_term_cond(TermCond::Stop, 0.0).expect("term");
    add_feed_line(&mut tp, pose_x(10.0));
    tp
}

#[test]
fn pause_midway_decays_then_resume_completes() {
    let mut tp = planner_with_line();
    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();

    // run to roughly the midpoint
    while tp.pos().x < 5.0 {
        tick(&mut tp, &mut io, &mut status);
    }
    tp.pause();

    // velocity must drain within maxvel/amax plus one cycle, i.e.
    // 100/1000 s = 100 ticks at 1 kHz (+ slack)
    let mut ticks_to_stop = 0;
    while status.current_vel > 0.0 {
        tick(&mut tp, &mut io, &mut status);
        ticks_to_stop += 1;
        assert!(ticks_to_stop < 110, "pause drain too slow");
    }

    // paused: position holds, nothing completes
    let held = tp.pos();
    for _ in 0..50 {
        tick(&mut tp, &mut io, &mut status);
        assert_eq!(tp.pos(), held);
        assert!(status.paused);
        assert!(!tp.is_done());
    }

    tp.resume();
    let fb = MotionFeedback::default();
    let mut budget = 20_000;
    while !tp.is_done() && budget > 0 {
        tp.run_cycle(&fb, &mut io, &mut status);
        budget -= 1;
    }
    assert!(tp.is_done());
    assert!((tp.pos().x - 10.0).abs() < 1e-9);
}

#[test]
fn pause_resume_on_empty_queue_is_noop() {
    let mut tp = TrajPlanner::new(16).expect("planner");
    let before = tp.pos();
    tp.pause();
    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    tick(&mut tp, &mut io, &mut status);
    tp.resume();
    tick(&mut tp, &mut io, &mut status);
    assert_eq!(tp.pos(), before);
    assert!(tp.is_done());
    assert!(!status.paused);
}

#[test]
fn abort_drains_then_discards_queue() {
    let mut tp = planner_with_line();
    add_feed_line(&mut tp, pose_x(20.0));
    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();

    while tp.pos().x < 3.0 {
        tick(&mut tp, &mut io, &mut status);
    }
    tp.abort();

    // adds are rejected for the whole drain
    assert_eq!(
        tp.add_line(
            pose_x(30.0),
            omk_common::status::MotionType::Feed,
            100.0,
            200.0,
            1000.0,
            omk_common::status::EnableFlags::empty(),
            false,
            None,
        ),
        Err(TpError::Aborting)
    );

    let mut budget = 1000;
    while !tp.is_done() && budget > 0 {
        tick(&mut tp, &mut io, &mut status);
        budget -= 1;
    }
    assert!(tp.is_done(), "abort never drained");
    assert!(!tp.is_aborting());
    assert_eq!(tp.queue_depth(), 0);

    // position was kept where the drain ended, short of the target
    let x = tp.pos().x;
    assert!(x > 3.0 && x < 10.0, "drained at {x}");
    // goal collapsed onto the drained position
    assert_eq!(tp.goal(), tp.pos());

    // and the planner accepts motion again
    add_feed_line(&mut tp, pose_x(x + 1.0));
    assert_eq!(tp.queue_depth(), 1);
}

#[test]
fn abort_discards_staged_io() {
    let mut tp = planner_with_line();
    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();

    while tp.pos().x < 2.0 {
        tick(&mut tp, &mut io, &mut status);
    }

    // an edge staged for a segment that never gets queued must not
    // survive the abort
    tp.set_dout(5, true, false).expect("set_dout");
    tp.abort();
    let mut budget = 1000;
    while !tp.is_done() && budget > 0 {
        tick(&mut tp, &mut io, &mut status);
        budget -= 1;
    }
    assert!(tp.is_done(), "abort never drained");

    let next_x = tp.pos().x + 1.0;
    add_feed_line(&mut tp, pose_x(next_x));
    let mut budget = 20_000;
    while !tp.is_done() && budget > 0 {
        tick(&mut tp, &mut io, &mut status);
        budget -= 1;
    }
    assert!(tp.is_done());
    assert!(
        !io.dio.contains(&(5, true)),
        "stale staged edge fired after abort"
    );
}

#[test]
fn feed_override_zero_holds_progress() {
    let mut tp = planner_with_line();
    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();

    while tp.pos().x < 4.0 {
        tick(&mut tp, &mut io, &mut status);
    }

    // override drops to zero mid-motion
    let frozen_fb = MotionFeedback {
        net_feed_scale: 0.0,
        ..MotionFeedback::default()
    };
    for _ in 0..500 {
        tp.run_cycle(&frozen_fb, &mut io, &mut status);
    }
    assert_eq!(status.current_vel, 0.0);
    let held_x = tp.pos().x;
    assert!(held_x > 4.0 && held_x < 10.0);
    assert!(!tp.is_done());

    // restore and finish
    let fb = MotionFeedback::default();
    let mut budget = 20_000;
    while !tp.is_done() && budget > 0 {
        tp.run_cycle(&fb, &mut io, &mut status);
        budget -= 1;
    }
    assert!((tp.pos().x - 10.0).abs() < 1e-9);
}
