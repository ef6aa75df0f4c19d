//! Cartesian line parametrised by arclength.

use crate::consts::EPS_MAG;
use crate::geom::pose::Cart;

/// A straight segment from `start` to `end` with cached unit direction
/// and magnitude.
///
/// Degenerate lines (`mag < EPS_MAG`) carry `zero_mag = true` and a zero
/// `uvec`; `point_at` then pins to the start point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartLine {
    pub start: Cart,
    pub end: Cart,
    /// Unit direction; zero vector when `zero_mag`.
    pub uvec: Cart,
    /// Total length, >= 0.
    pub mag: f64,
    pub zero_mag: bool,
}

impl CartLine {
    pub fn new(start: Cart, end: Cart) -> Self {
        let d = end - start;
        let mag = d.mag();
        match d.unit() {
            Some(uvec) => Self {
                start,
                end,
                uvec,
                mag,
                zero_mag: false,
            },
            None => Self {
                start,
                end,
                uvec: Cart::ZERO,
                mag: 0.0,
                zero_mag: true,
            },
        }
    }

    /// A degenerate line pinned at `point`.
    pub fn pinned(point: Cart) -> Self {
        Self::new(point, point)
    }

    /// Point at arclength `d` from the start.
    ///
    /// `d` past `mag` extrapolates along `uvec`; the rigid-tap overrun
    /// relies on this.
    #[inline]
    pub fn point_at(&self, d: f64) -> Cart {
        if self.zero_mag {
            self.start
        } else {
            self.start + self.uvec.scale(d)
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
