//! Planner error types.
//!
//! Producer-side calls fail fast with no state change; nothing in the
//! real-time cycle path returns an error or panics.

use thiserror::Error;

/// Errors returned by the producer-side planner API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TpError {
    /// Rejected argument; the message names the offending parameter.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Segment queue is full; the goal pose was not advanced.
    #[error("segment queue full")]
    QueueFull,

    /// An abort is draining; all motion commands are rejected until it
    /// completes.
    #[error("planner is aborting")]
    Aborting,

    /// Rigid tapping requires position-mode spindle synchronisation.
    #[error("rigid tap requires position-mode spindle sync")]
    UnsynchronizedTap,

    /// Motion id out of range.
    #[error("invalid motion id {0}")]
    InvalidMotionId(u32),

    /// The staged synchronous-I/O batch is full.
    #[error("staged sync I/O batch full")]
    SyncIoOverflow,
}

pub type TpResult<T> = Result<T, TpError>;
