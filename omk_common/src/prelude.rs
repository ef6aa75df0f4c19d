//! Common re-exports for planner hosts.

pub use crate::consts::*;
pub use crate::geom::{Cart, CartLine, Circle, Pose};
pub use crate::io::{MotionIo, NullIo, SyncIoBatch};
pub use crate::status::{EnableFlags, MotionFeedback, MotionType, TpStatus};
