//! Global constants shared by the planner core and its hosts.
//!
//! Epsilons, queue sizing, and the fixed geometry/kinematics factors of
//! the blending and rigid-tap subsystems. Config-tunable values carry
//! `_DEFAULT`/`_MIN`/`_MAX` triples enforced by `PlannerConfig::validate`.

/// Number of pose axes (X Y Z A B C U V W).
pub const POSE_AXES: usize = 9;

/// Default segment queue capacity.
pub const TC_QUEUE_SIZE_DEFAULT: usize = 32;
/// Minimum segment queue capacity.
pub const TC_QUEUE_SIZE_MIN: usize = 8;
/// Maximum segment queue capacity.
pub const TC_QUEUE_SIZE_MAX: usize = 512;

/// Default look-ahead depth (backward end-velocity pass).
pub const LOOKAHEAD_DEPTH_DEFAULT: usize = 8;
/// Minimum look-ahead depth.
pub const LOOKAHEAD_DEPTH_MIN: usize = 2;
/// Maximum look-ahead depth.
pub const LOOKAHEAD_DEPTH_MAX: usize = 64;

/// Default servo cycle time [µs] (1 kHz).
pub const CYCLE_TIME_US_DEFAULT: u32 = 1000;
/// Minimum servo cycle time [µs].
pub const CYCLE_TIME_US_MIN: u32 = 100;
/// Maximum servo cycle time [µs].
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

/// Magnitude threshold below which a vector or line is degenerate.
pub const EPS_MAG: f64 = 1e-10;
/// Angular tolerance [rad] for unit-tangent agreement checks.
pub const EPS_ANGLE: f64 = 1e-6;
/// Acceleration threshold below which a profile cannot advance.
pub const EPS_ACCEL: f64 = 1e-9;

/// Corner angle [rad] below which two lines are treated as already
/// tangent; a blend arc is only attempted for corners within
/// `[CRIT_ANGLE, PI - CRIT_ANGLE]`.
pub const CRIT_ANGLE: f64 = 1e-2;

/// Fraction of the following segment a blend arc may consume.
pub const BLEND_RATIO: f64 = 0.5;

/// Tangential/normal acceleration split for blend arcs (1/sqrt(2)).
pub const ARC_ACCEL_SPLIT: f64 = core::f64::consts::FRAC_1_SQRT_2;
/// Safety margin applied to the normal-acceleration budget of an arc.
pub const ARC_NORMAL_SAFETY: f64 = 0.98;

/// Rigid-tap overrun allowance [spindle revolutions].
pub const TAP_OVERRUN_REVS: f64 = 10.0;

/// Sample-rate velocity factor: `maxvel <= 0.5 * target / cycle_time`
/// so every segment spans at least two servo ticks.
pub const SAMPLE_VEL_FACTOR: f64 = 0.5;

/// Final-deceleration detection tolerance [user units/s].
pub const FINAL_DECEL_TOL: f64 = 1e-3;

/// Motion id reserved for "no segment".
pub const INVALID_MOTION_ID: u32 = 0;

/// Capacity of the staged digital-output batch.
pub const MAX_SYNC_DIO: usize = 16;
/// Capacity of the staged analog-output batch.
pub const MAX_SYNC_AIO: usize = 8;
