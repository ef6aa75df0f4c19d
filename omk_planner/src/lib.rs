//! # OMK Trajectory Planner
//!
//! Real-time trajectory planner core for the OMK motion kernel: a
//! bounded queue of parameterised motion segments, a look-ahead
//! optimiser, a per-tick trapezoidal profiler with final-velocity
//! handover, tangent blend-arc construction between linear moves, and a
//! rigid-tap state machine synchronised to a spindle encoder — all
//! driven by a single per-tick cycle entry point.
//!
//! ## Zero-Allocation RT Path
//!
//! The queue arena is allocated once at planner creation; `run_cycle`
//! performs no heap allocation, never blocks, and models every wait as
//! a stall state. The producer-side API (`add_line`, `add_circle`,
//! `add_rigid_tap`, pause/resume/abort) is the only place errors are
//! surfaced.

#![deny(clippy::disallowed_types)]

pub mod blend;
pub mod config;
pub mod cycle;
pub mod error;
pub mod host;
pub mod lookahead;
pub mod planner;
pub mod profile;
pub mod queue;
pub mod rigidtap;
pub mod segment;
pub mod sim;
pub mod spindle;

pub use config::{ConfigError, PlannerConfig, load_config, load_config_from_str};
pub use error::{TpError, TpResult};
pub use planner::TrajPlanner;
