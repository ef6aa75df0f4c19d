//! Circular and helical arc parametrised by arclength.
//!
//! The arc is stored as an in-plane basis (`rtan`, `rperp`) about
//! `center` plus a helical rise vector along `normal`:
//!
//! `p(theta) = center + rtan*cos(theta) + rperp*sin(theta)
//!             + rhelix * theta/angle`
//!
//! so point-at-arclength is closed form. Rotation sense follows the
//! right-hand rule about `normal`.

use core::f64::consts::TAU;

use crate::consts::{EPS_ANGLE, EPS_MAG};
use crate::geom::pose::Cart;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub start: Cart,
    pub end: Cart,
    pub center: Cart,
    /// Unit plane normal (rotation axis, right-handed).
    pub normal: Cart,
    /// Extra full revolutions beyond the base sweep.
    pub turn: u32,
    pub radius: f64,
    /// Total sweep [rad], > 0.
    pub angle: f64,
    /// In-plane radius vector at the start point.
    pub rtan: Cart,
    /// In-plane vector a quarter turn ahead of `rtan`.
    pub rperp: Cart,
    /// Helical rise over the full sweep (along `normal`).
    pub rhelix: Cart,
}

impl Circle {
    /// Construct from canonical arc data: start and end points, center,
    /// plane normal and extra turn count.
    ///
    /// Returns `None` when the normal or the start radius is degenerate.
    /// A projected sweep of ~0 with `turn == 0` is taken as a full
    /// circle.
    pub fn from_center_normal(
        start: Cart,
        end: Cart,
        center: Cart,
        normal: Cart,
        turn: u32,
    ) -> Option<Self> {
        let n = normal.unit()?;

        let v_start = start - center;
        let rtan = v_start - n.scale(v_start.dot(n));
        let radius = rtan.mag();
        if radius < EPS_MAG {
            return None;
        }

        let v_end = end - center;
        let rend = v_end - n.scale(v_end.dot(n));
        let u_start = rtan.unit()?;
        let u_end = rend.unit()?;

        let mut angle = u_start.dot(u_end).clamp(-1.0, 1.0).acos();
        if u_start.cross(u_end).dot(n) < 0.0 {
            // end lies behind the rotation sense: sweep the long way
            angle = TAU - angle;
        }
        if angle < EPS_ANGLE {
            angle = TAU;
        }
        angle += turn as f64 * TAU;

        let rperp = n.cross(rtan);
        let rhelix = n.scale((end - start).dot(n));

        Some(Self {
            start,
            end,
            center,
            normal: n,
            turn,
            radius,
            angle,
            rtan,
            rperp,
            rhelix,
        })
    }

    /// Fit the tangent arc that replaces the corner `apex` between an
    /// incoming line ending at `start` and an outgoing line beginning
    /// at `end`, with the given radius.
    ///
    /// The arc lies in the plane of the two lines, is tangent to both,
    /// and its center sits on the interior bisector of the corner.
    pub fn from_blend(start: Cart, apex: Cart, end: Cart, radius: f64) -> Option<Self> {
        let u_in = (apex - start).unit()?;
        let u_out = (end - apex).unit()?;

        let normal = u_in.cross(u_out).unit()?;
        let bisect = (u_out - u_in).unit()?;

        let omega = u_in.dot(u_out).clamp(-1.0, 1.0).acos();
        let theta = 0.5 * (core::f64::consts::PI - omega);
        let sin_t = theta.sin();
        if sin_t < EPS_MAG {
            return None;
        }

        let center = apex + bisect.scale(radius / sin_t);
        Self::from_center_normal(start, end, center, normal, 0)
    }

    /// Total arclength, including the helical rise.
    #[inline]
    pub fn arclength(&self) -> f64 {
        let planar = self.angle * self.radius;
        (planar * planar + self.rhelix.mag_sq()).sqrt()
    }

    /// Point at arclength `s` from the start.
    pub fn point_at(&self, s: f64) -> Cart {
        let len = self.arclength();
        let theta = if len < EPS_MAG {
            0.0
        } else {
            self.angle * (s / len)
        };
        self.center
            + self.rtan.scale(theta.cos())
            + self.rperp.scale(theta.sin())
            + self.rhelix.scale(theta / self.angle)
    }

    /// Unit tangent at arclength `s`, `None` for a degenerate arc.
    pub fn tangent_at(&self, s: f64) -> Option<Cart> {
        let len = self.arclength();
        if len < EPS_MAG {
            return None;
        }
        let theta = self.angle * (s / len);
        let planar = self.rperp.scale(theta.cos()) - self.rtan.scale(theta.sin());
        (planar + self.rhelix.scale(1.0 / self.angle)).unit()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
