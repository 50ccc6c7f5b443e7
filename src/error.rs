use core::fmt::Display;
use std::error::Error;

/// Grid axis, used to label dimension errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "sizeX"),
            Axis::Y => write!(f, "sizeY"),
            Axis::Z => write!(f, "sizeZ"),
        }
    }
}

/// Everything the engine can report.
///
/// Numeric divergence is deliberately absent: unstable parameters produce
/// non-finite values and the engine keeps computing.
#[derive(Clone, Debug, PartialEq)]
pub enum HeatError {
    /// A grid size below 1.
    InvalidDimension { axis: Axis, value: i64 },
    /// Sizes that are each valid but whose cell count cannot be allocated.
    GridTooLarge { dims: (usize, usize, usize) },
    /// A negative step count.
    InvalidStepCount(i64),
    /// `read` outside of `[0, size)` on some axis.
    OutOfRange {
        x: usize,
        y: usize,
        z: usize,
        dims: (usize, usize, usize),
    },
    /// One or more parallel workers failed; the run was discarded.
    WorkerFailed(String),
    /// The worker pool could not be created.
    ThreadPool(String),
}

impl Display for HeatError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            HeatError::InvalidDimension { axis, value } => {
                write!(f, "invalid dimension: {} = {} (must be >= 1)", axis, value)
            }
            HeatError::GridTooLarge { dims } => write!(
                f,
                "grid {}x{}x{} is too large to allocate",
                dims.0, dims.1, dims.2
            ),
            HeatError::InvalidStepCount(steps) => {
                write!(f, "invalid step count: {} (must be >= 0)", steps)
            }
            HeatError::OutOfRange { x, y, z, dims } => write!(
                f,
                "coordinate ({}, {}, {}) outside of grid {}x{}x{}",
                x, y, z, dims.0, dims.1, dims.2
            ),
            HeatError::WorkerFailed(message) => write!(f, "parallel run failed: {}", message),
            HeatError::ThreadPool(message) => write!(f, "could not build worker pool: {}", message),
        }
    }
}

impl Error for HeatError {}

impl From<rayon::ThreadPoolBuildError> for HeatError {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        HeatError::ThreadPool(value.to_string())
    }
}

/// Turns the payload of a caught panic into a readable message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
