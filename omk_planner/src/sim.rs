//! Deterministic spindle model for the host demo and integration
//! tests.
//!
//! First-order approach to the commanded speed, revolution integration,
//! at-speed detection and encoder index emulation: enough plant to
//! drive at-speed gates, feed-per-rev sync and full rigid-tap cycles
//! end to end without hardware.

use omk_common::status::MotionFeedback;

/// Simulated spindle with encoder.
#[derive(Debug, Clone)]
pub struct SimSpindle {
    /// Commanded speed [rev/s], signed.
    commanded_rps: f64,
    /// Actual speed [rev/s], slews toward the command.
    actual_rps: f64,
    /// Accumulated revolutions (signed integral of actual speed).
    pub revs: f64,
    /// Rotation sense latched at spindle start; reversals during a tap
    /// do not change it.
    direction: i32,
    /// Index latch request line; cleared at the next index crossing.
    pub index_enable: bool,
    /// Spin-up/down slew rate [rev/s^2].
    accel_rps2: f64,
}

impl SimSpindle {
    pub fn new(accel_rps2: f64) -> Self {
        Self {
            commanded_rps: 0.0,
            actual_rps: 0.0,
            revs: 0.0,
            direction: 1,
            index_enable: false,
            accel_rps2: accel_rps2.abs(),
        }
    }

    /// Command a new speed. The rotation sense latches on the first
    /// non-zero command from rest.
    pub fn command(&mut self, rps: f64) {
        if self.commanded_rps == 0.0 && rps != 0.0 {
            self.direction = if rps < 0.0 { -1 } else { 1 };
        }
        self.commanded_rps = rps;
    }

    #[inline]
    pub fn commanded(&self) -> f64 {
        self.commanded_rps
    }

    #[inline]
    pub fn actual(&self) -> f64 {
        self.actual_rps
    }

    /// Within 2% of the commanded speed (or stopped when commanded
    /// stopped).
    pub fn at_speed(&self) -> bool {
        if self.commanded_rps == 0.0 {
            self.actual_rps.abs() < 0.01
        } else {
            (self.actual_rps - self.commanded_rps).abs() <= 0.02 * self.commanded_rps.abs()
        }
    }

    /// Advance the plant by one tick.
    pub fn tick(&mut self, dt: f64) {
        let delta = self.commanded_rps - self.actual_rps;
        let max_step = self.accel_rps2 * dt;
        self.actual_rps += delta.clamp(-max_step, max_step);

        let revs_before = self.revs;
        self.revs += self.actual_rps * dt;

        // encoder index: reset the count at the next whole revolution
        // while the latch is armed
        if self.index_enable && self.revs.floor() != revs_before.floor() {
            self.revs = 0.0;
            self.index_enable = false;
        }
    }

    /// Snapshot the feedback block for the planner.
    pub fn feedback(&self, net_feed_scale: f64) -> MotionFeedback {
        MotionFeedback {
            spindle_revs: self.revs,
            spindle_speed_in: self.commanded_rps,
            net_feed_scale,
            spindle_direction: self.direction,
            spindle_at_speed: self.at_speed(),
            spindle_index_enable: self.index_enable,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
