//! OMK planner host runner.
//!
//! Loads a TOML configuration, queues a demo program, and drives the
//! planner cycle against a simulated spindle at the configured servo
//! period. Useful for smoke-testing a configuration and for watching
//! the planner's status stream without real hardware.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use omk_common::geom::Pose;
use omk_common::io::NullIo;
use omk_common::status::{EnableFlags, MotionFeedback, MotionType, TpStatus};

use omk_planner::config::{PlannerConfig, load_config};
use omk_planner::host::{CyclePacer, CycleStats, rt_setup};
use omk_planner::sim::SimSpindle;
use omk_planner::TrajPlanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Demo {
    /// A 100mm square with parabolic corner blending.
    Square,
    /// A position-synced rigid tap cycle.
    Tap,
}

#[derive(Debug, Parser)]
#[command(name = "omk_planner", about = "OMK trajectory planner host runner")]
struct Args {
    /// Path to the planner TOML configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of servo ticks to run.
    #[arg(short, long, default_value_t = 60_000)]
    ticks: u64,

    /// Demo program to queue.
    #[arg(long, value_enum, default_value_t = Demo::Square)]
    demo: Demo,

    /// Run unpaced (as fast as possible).
    #[arg(long)]
    no_pace: bool,
}

fn queue_square(tp: &mut TrajPlanner, cfg: &PlannerConfig) -> Result<(), omk_planner::TpError> {
    let corners = [
        (100.0, 0.0),
        (100.0, 100.0),
        (0.0, 100.0),
        (0.0, 0.0),
    ];
    for (x, y) in corners {
        let end = Pose {
            x,
            y,
            ..Pose::ZERO
        };
        tp.add_line(
            end,
            MotionType::Feed,
            cfg.vmax,
            cfg.ini_maxvel,
            cfg.amax,
            EnableFlags::FEED_OVERRIDE,
            false,
            None,
        )?;
    }
    Ok(())
}

fn queue_tap(tp: &mut TrajPlanner, cfg: &PlannerConfig) -> Result<(), omk_planner::TpError> {
    tp.set_spindle_sync(1.0, false)?;
    let bottom = Pose {
        z: -20.0,
        ..Pose::ZERO
    };
    tp.add_rigid_tap(
        bottom,
        cfg.vmax.min(20.0),
        cfg.ini_maxvel,
        cfg.amax,
        EnableFlags::empty(),
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => PlannerConfig::default(),
    };
    info!(?cfg, "configuration loaded");

    rt_setup(cfg.cpu_core, cfg.rt_priority)?;

    let mut tp = TrajPlanner::from_config(&cfg)?;
    match args.demo {
        Demo::Square => queue_square(&mut tp, &cfg)?,
        Demo::Tap => queue_tap(&mut tp, &cfg)?,
    }
    info!(demo = ?args.demo, depth = tp.queue_depth(), "program queued");

    let cycle_time = cfg.cycle_time();
    let cycle_ns = (cycle_time * 1e9) as i64;
    let mut pacer = CyclePacer::new(cycle_ns)?;
    let mut stats = CycleStats::new();

    let mut spindle = SimSpindle::new(40.0);
    if args.demo == Demo::Tap {
        spindle.command(8.0);
    }

    let mut io = NullIo;
    let mut status = TpStatus::default();

    for tick in 0..args.ticks {
        let t0 = Instant::now();

        // hardware side: propagate the index request, spin the plant.
        // A zero speed command means the planner has no opinion yet.
        spindle.index_enable = status.spindle_index_enable || spindle.index_enable;
        if status.spindle_speed_out != 0.0 {
            spindle.command(status.spindle_speed_out);
        }
        spindle.tick(cycle_time);

        let fb: MotionFeedback = spindle.feedback(1.0);
        tp.run_cycle(&fb, &mut io, &mut status);

        stats.record(t0.elapsed().as_nanos() as i64, cycle_ns);

        if tick % cfg.status_log_interval == 0 {
            info!(
                tick,
                x = status.position.x,
                y = status.position.y,
                z = status.position.z,
                vel = status.current_vel,
                dtg = status.distance_to_go,
                exec_id = status.exec_id,
                "status"
            );
        }
        if status.done && tick > 0 {
            info!(tick, "program complete");
            break;
        }

        if !args.no_pace {
            pacer.wait();
        }
    }

    info!(
        cycles = stats.cycle_count,
        avg_ns = stats.avg_cycle_ns(),
        max_ns = stats.max_cycle_ns,
        overruns = stats.overruns,
        "cycle statistics"
    );
    Ok(())
}
