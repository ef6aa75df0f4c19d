//! # OMK Common Library
//!
//! Shared leaf types for the OMK motion kernel: nine-axis pose algebra,
//! Cartesian line/arc primitives, the planner status block, and the
//! hardware-shim trait the real-time cycle drives its I/O through.
//!
//! # Module Structure
//!
//! - [`geom`] - Pose algebra and line/circle parametrisation
//! - [`status`] - Outbound status block and inbound per-tick feedback
//! - [`io`] - Hardware shim trait and staged synchronous I/O batch
//! - [`consts`] - Epsilons, sizing, and fixed kinematic factors
//! - [`prelude`] - Common re-exports for convenience

pub mod consts;
pub mod geom;
pub mod io;
pub mod prelude;
pub mod status;
