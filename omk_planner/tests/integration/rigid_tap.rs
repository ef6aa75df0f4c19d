//! Rigid-tap cycle against the simulated spindle: at-speed gate,
//! encoder index latch, synchronised descent, double reversal, and
//! final placement back at the entry point.

use omk_common::geom::Pose;
use omk_common::status::{EnableFlags, TpStatus};
use omk_planner::TrajPlanner;
use omk_planner::sim::SimSpindle;

use super::harness::RecordingIo;

struct TapRun {
    trace: Vec<(Pose, f64)>,
    speed_flips: usize,
    ticks: usize,
}

/// Drive a full tap cycle with the host-side hardware emulation the
/// bundled runner uses: propagate the index request, adopt non-zero
/// speed commands, then tick the plant before the planner.
fn run_tap(depth: f64, max_ticks: usize) -> (TrajPlanner, TpStatus, TapRun) {
    const DT: f64 = 0.001;

    let mut tp = TrajPlanner::new(16).expect("planner");
    tp.set_spindle_sync(1.0, false).expect("sync");
    let bottom = Pose {
        z: depth,
        ..Pose::ZERO
    };
    tp.add_rigid_tap(bottom, 10.0, 20.0, 1000.0, EnableFlags::empty())
        .expect("add_rigid_tap");

    let mut spindle = SimSpindle::new(40.0);
    spindle.command(8.0);

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    let mut trace = Vec::new();
    let mut speed_flips = 0;
    let mut last_cmd = 8.0_f64;

    for tick in 0..max_ticks {
        spindle.index_enable = status.spindle_index_enable || spindle.index_enable;
        if status.spindle_speed_out != 0.0 {
            spindle.command(status.spindle_speed_out);
        }
        spindle.tick(DT);

        let fb = spindle.feedback(1.0);
        tp.run_cycle(&fb, &mut io, &mut status);
        trace.push((status.position, status.current_vel));

        if status.spindle_speed_out != 0.0 && status.spindle_speed_out.signum() != last_cmd.signum()
        {
            speed_flips += 1;
            last_cmd = status.spindle_speed_out;
        }

        if tp.is_done() {
            return (
                tp,
                status,
                TapRun {
                    trace,
                    speed_flips,
                    ticks: tick + 1,
                },
            );
        }
    }
    panic!("tap cycle did not finish within {max_ticks} ticks");
}

#[test]
fn full_cycle_returns_to_entry() {
    let (tp, status, run) = run_tap(10.0, 50_000);

    // two commanded reversals: into retraction, and back forward
    assert_eq!(run.speed_flips, 2);

    // thread cut to at least the nominal depth before reversing
    let max_z = run.trace.iter().map(|(p, _)| p.z).fold(0.0_f64, f64::max);
    assert!(max_z >= 10.0, "max depth {max_z}");

    // and the pass ends exactly back at the entry point
    let end = tp.pos();
    assert!(end.z.abs() < 1e-6, "final z {}", end.z);
    assert!(end.x.abs() < 1e-9 && end.y.abs() < 1e-9);
    assert!(status.done);
    assert!(!status.spindle_sync);
}

#[test]
fn descent_tracks_the_spindle_feed_per_rev() {
    let (_, _, run) = run_tap(10.0, 50_000);

    // once synced and past spin-up, the feed is ~8 uu/s (8 rev/s at
    // 1 uu/rev); sample mid-descent
    let mid = run
        .trace
        .iter()
        .filter(|(p, _)| p.z > 3.0 && p.z < 8.0)
        .map(|(_, v)| *v)
        .collect::<Vec<_>>();
    assert!(!mid.is_empty());
    let avg: f64 = mid.iter().sum::<f64>() / mid.len() as f64;
    assert!((avg - 8.0).abs() < 1.0, "descent feed {avg}");

    // the whole cycle takes a few seconds of servo time
    assert!(run.ticks > 2000, "suspiciously fast: {} ticks", run.ticks);
}

#[test]
fn waits_for_spindle_before_cutting() {
    const DT: f64 = 0.001;

    let mut tp = TrajPlanner::new(16).expect("planner");
    tp.set_spindle_sync(1.0, false).expect("sync");
    tp.add_rigid_tap(
        Pose {
            z: 5.0,
            ..Pose::ZERO
        },
        10.0,
        20.0,
        1000.0,
        EnableFlags::empty(),
    )
    .expect("add_rigid_tap");

    // spindle commanded but still winding up: no motion may happen
    let mut spindle = SimSpindle::new(40.0);
    spindle.command(8.0);

    let mut io = RecordingIo::default();
    let mut status = TpStatus::default();
    for _ in 0..50 {
        spindle.tick(DT);
        let fb = spindle.feedback(1.0);
        tp.run_cycle(&fb, &mut io, &mut status);
        assert_eq!(tp.pos().z, 0.0, "moved before spindle at speed");
    }
    assert_eq!(status.waiting_for_atspeed, 1);
}
